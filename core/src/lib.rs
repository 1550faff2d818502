/// Chat room core
///
/// An injectable in-memory event bus plus the components that reconcile its
/// events into local state: the contact directory, the message log and the
/// friend-request resolver.

pub mod error;
pub mod config;
pub mod bus;
pub mod chat_types;
pub mod directory;
pub mod message_log;
pub mod friend_request;
pub mod chat_room;
pub mod transport;
pub mod render;

pub use error::{ChatError, Result};
pub use config::Config;
pub use bus::{EventContext, EventName, EventPayload};
pub use chat_room::ChatRoom;
