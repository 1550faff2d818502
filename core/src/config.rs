/// Configuration management
use crate::error::{ChatError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_MAX_PASSES: usize = 8;

/// Replay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// JSON-lines replay script
    pub script: PathBuf,

    /// Nickname published as `show_user_info` before the script runs
    pub user: Option<String>,

    /// Reconciliation passes allowed per dispatch before giving up
    pub max_passes: usize,

    /// Print the final state as JSON
    pub json: bool,

    /// Disable ANSI colors
    pub no_color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            script: PathBuf::new(),
            user: None,
            max_passes: DEFAULT_MAX_PASSES,
            json: false,
            no_color: false,
        }
    }
}

impl Config {
    /// Create config from command line arguments
    pub fn from_args(args: &[String]) -> Result<Self> {
        if args.len() < 2 {
            return Err(ChatError::Config(format!(
                "Usage: {} <script.jsonl> [--user <nickname>] [--max-passes <n>] [--json] [--no-color]",
                args.first().map(String::as_str).unwrap_or("chatroom")
            )));
        }

        let mut script: Option<PathBuf> = None;
        let mut user: Option<String> = None;
        let mut max_passes: Option<usize> = None;
        let mut json = false;
        let mut no_color = false;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--user" => {
                    let nickname = args.get(i + 1).ok_or_else(|| {
                        ChatError::Config("--user requires a nickname".to_string())
                    })?;
                    user = Some(nickname.clone());
                    i += 2;
                }
                "--max-passes" => {
                    let n = args.get(i + 1).ok_or_else(|| {
                        ChatError::Config("--max-passes requires a number".to_string())
                    })?;
                    max_passes = Some(parse_passes(n)?);
                    i += 2;
                }
                "--json" => {
                    json = true;
                    i += 1;
                }
                "--no-color" => {
                    no_color = true;
                    i += 1;
                }
                flag if flag.starts_with("--") => {
                    return Err(ChatError::Config(format!("Unknown flag {}", flag)));
                }
                other => {
                    if script.is_some() {
                        return Err(ChatError::Config(format!(
                            "Unexpected argument {}",
                            other
                        )));
                    }
                    script = Some(PathBuf::from(other));
                    i += 1;
                }
            }
        }

        // Env overrides (flags win)
        if user.is_none() {
            user = std::env::var("CHATROOM_USER").ok().filter(|u| !u.is_empty());
        }
        if max_passes.is_none() {
            if let Ok(n) = std::env::var("CHATROOM_MAX_PASSES") {
                max_passes = Some(parse_passes(&n)?);
            }
        }
        if std::env::var_os("NO_COLOR").is_some() {
            no_color = true;
        }

        let script =
            script.ok_or_else(|| ChatError::Config("Missing script path".to_string()))?;

        Ok(Self {
            script,
            user,
            max_passes: max_passes.unwrap_or(DEFAULT_MAX_PASSES),
            json,
            no_color,
        })
    }
}

fn parse_passes(raw: &str) -> Result<usize> {
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ChatError::Config(
            "--max-passes must be a positive number".to_string(),
        )),
    }
}
