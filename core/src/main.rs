/// Chat room replay - feeds a recorded session through the event bus
use chatroom_core::bus::{BusChange, EventName, EventPayload};
use chatroom_core::chat_types::CurrentUser;
use chatroom_core::transport::{replay, ReplayScript};
use chatroom_core::{render, ChatRoom, Config};
use std::env;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse configuration
    let args: Vec<String> = env::args().collect();
    let config = Config::from_args(&args)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    if config.no_color {
        colored::control::set_override(false);
    }

    let script = ReplayScript::load(&config.script)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load {:?}: {}", config.script, e))?;

    let mut room = ChatRoom::from_config(&config);

    // Bus changes are drained once the replay yields
    let mut changes = room.bus().subscribe();
    let watcher = tokio::spawn(async move {
        let mut seen = 0usize;
        loop {
            match changes.recv().await {
                Ok(BusChange::Added { name, version }) => {
                    debug!("bus: +{} v{}", name, version);
                    seen += 1;
                }
                Ok(BusChange::Removed { name }) => {
                    debug!("bus: -{}", name);
                    seen += 1;
                }
                Err(RecvError::Lagged(n)) => {
                    warn!("Change watcher lagged {} events", n);
                    seen += n as usize;
                }
                Err(RecvError::Closed) => break,
            }
        }
        seen
    });

    if let Some(nickname) = &config.user {
        room.deliver(
            EventName::ShowUserInfo,
            EventPayload::UserInfo(CurrentUser::new(nickname.clone())),
        )
        .map_err(|e| anyhow::anyhow!("Failed to publish user info: {}", e))?;
    }

    info!("Replaying {} steps", script.len());
    let json = config.json;
    let report = replay(&mut room, &script, |event| {
        if !json {
            println!("{}", render::outbound_line(event));
        }
    })
    .map_err(|e| anyhow::anyhow!("Replay aborted: {}", e))?;

    if report.rejected.is_empty() {
        info!("Applied {} steps", report.applied);
    } else {
        warn!(
            "Applied {} steps, {} refused",
            report.applied,
            report.rejected.len()
        );
    }

    let snapshot = room.snapshot();
    if config.json {
        let output = serde_json::json!({
            "room": snapshot,
            "outbound": report.outbound,
            "rejected": report
                .rejected
                .iter()
                .map(|(line, reason)| serde_json::json!({ "line": line, "reason": reason }))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!();
        render::print_room(&snapshot);
    }

    // Closing the bus ends the watcher
    drop(room);
    match watcher.await {
        Ok(seen) => info!("Observed {} bus changes", seen),
        Err(e) => warn!("Change watcher failed: {}", e),
    }

    Ok(())
}
