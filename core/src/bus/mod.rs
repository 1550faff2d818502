//! In-memory event bus shared by the chat room components.
//!
//! Producers call [`EventContext::add_event`]; consumers read with
//! [`EventContext::get_event_data`] and acknowledge with
//! [`EventContext::remove_event`]. A component that reads and immediately
//! acknowledges on every bus mutation processes each emission at most once.
//!
//! `show_user_info` is the only persistent event: it is a latest-value cell
//! that stays readable and cannot be acknowledged.

mod context;
mod event;

pub use context::{BusChange, Event, EventContext};
pub use event::{EventName, EventPayload, PayloadShape};

use crate::error::Result;

/// A component that folds bus events into its own local state.
pub trait Reconciler {
    /// Run one polling pass over the bus.
    ///
    /// Returns true when local state changed.
    fn reconcile(&mut self, bus: &mut EventContext) -> Result<bool>;
}
