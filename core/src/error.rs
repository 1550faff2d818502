/// Error types for the chat room core
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown event name: {0}")]
    UnknownEvent(String),

    #[error("Payload mismatch: event {expected} cannot carry a {found} payload")]
    PayloadMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Invalid payload for {event}: {reason}")]
    InvalidPayload { event: &'static str, reason: String },

    #[error("No friend request is open")]
    NoPendingRequest,

    #[error("Bus did not settle after {passes} reconciliation passes")]
    Unsettled { passes: usize },

    #[error("Script error on line {line}: {reason}")]
    Script { line: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, ChatError>;
