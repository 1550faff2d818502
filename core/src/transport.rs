/// Scripted transport: replays recorded server events and user actions into a room
use crate::bus::Event;
use crate::chat_room::{ChatRoom, Component};
use crate::error::{ChatError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// One line of a replay script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Event deposited by the server side
    Deliver {
        event: String,
        #[serde(default)]
        payload: serde_json::Value,
    },
    Accept,
    Reject,
    Select { contact: String },
    Delete { contact: String },
    Search { term: String },
    ClearSearch,
    Send { text: String },
    Mount { component: Component },
    Unmount { component: Component },
}

#[derive(Debug, Clone, Default)]
pub struct ReplayScript {
    steps: Vec<(usize, Step)>,
}

impl ReplayScript {
    /// Parse JSON lines. Blank lines and `#` comments are skipped.
    pub fn parse(source: &str) -> Result<Self> {
        let mut steps = Vec::new();
        for (index, line) in source.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let step = serde_json::from_str::<Step>(trimmed).map_err(|e| ChatError::Script {
                line: index + 1,
                reason: e.to_string(),
            })?;
            steps.push((index + 1, step));
        }
        Ok(Self { steps })
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let source = tokio::fs::read_to_string(path).await?;
        let script = Self::parse(&source)?;
        info!("Loaded {} steps from {:?}", script.len(), path);
        Ok(script)
    }

    /// Steps with their source line numbers
    pub fn steps(&self) -> &[(usize, Step)] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Outcome of a replay
#[derive(Debug, Default)]
pub struct ReplayReport {
    pub applied: usize,
    /// (line, error) for every step the room refused
    pub rejected: Vec<(usize, String)>,
    pub outbound: Vec<Event>,
}

/// Apply a single step to the room
pub fn apply(room: &mut ChatRoom, step: &Step) -> Result<()> {
    match step {
        Step::Deliver { event, payload } => {
            room.deliver_json(event, payload.clone())?;
        }
        Step::Accept => {
            room.accept_request()?;
        }
        Step::Reject => {
            room.reject_request()?;
        }
        Step::Select { contact } => {
            room.select_contact(contact)?;
        }
        Step::Delete { contact } => {
            room.delete_contact(contact)?;
        }
        Step::Search { term } => room.search(term),
        Step::ClearSearch => room.clear_search(),
        Step::Send { text } => {
            room.send_text(text)?;
        }
        Step::Mount { component } => {
            room.mount(*component)?;
        }
        Step::Unmount { component } => {
            room.unmount(*component);
        }
    }
    Ok(())
}

/// Run every step, draining outbound events after each one.
///
/// Refused steps are logged and recorded; only a bus that never settles
/// stops the replay.
pub fn replay(
    room: &mut ChatRoom,
    script: &ReplayScript,
    mut on_outbound: impl FnMut(&Event),
) -> Result<ReplayReport> {
    let mut report = ReplayReport::default();

    for (line, step) in script.steps() {
        debug!("Line {}: {:?}", line, step);
        match apply(room, step) {
            Ok(()) => report.applied += 1,
            Err(e @ ChatError::Unsettled { .. }) => return Err(e),
            Err(e) => {
                warn!("Line {} refused: {}", line, e);
                report.rejected.push((*line, e.to_string()));
            }
        }
        for event in room.take_outbound() {
            on_outbound(&event);
            report.outbound.push(event);
        }
    }

    Ok(report)
}
