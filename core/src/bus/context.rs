use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use super::event::{EventName, EventPayload};
use crate::error::Result;

const CHANGE_CAPACITY: usize = 256;

/// A stored event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub name: EventName,
    pub payload: EventPayload,
    /// Number of times `name` has been added, this one included
    pub version: u64,
}

/// Change notification fanned out to subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusChange {
    Added { name: EventName, version: u64 },
    Removed { name: EventName },
}

/// Always-readable value; writes overwrite, nothing acknowledges it.
#[derive(Debug, Default)]
struct LatestCell {
    event: Option<Event>,
}

impl LatestCell {
    fn set(&mut self, event: Event) {
        self.event = Some(event);
    }

    fn get(&self) -> Option<&Event> {
        self.event.as_ref()
    }
}

/// At most one unacknowledged event; consumers must take it.
#[derive(Debug, Default)]
struct PendingSlot {
    event: Option<Event>,
}

impl PendingSlot {
    /// Returns the event that was overwritten, if any
    fn put(&mut self, event: Event) -> Option<Event> {
        self.event.replace(event)
    }

    fn peek(&self) -> Option<&Event> {
        self.event.as_ref()
    }

    fn take(&mut self) -> Option<Event> {
        self.event.take()
    }
}

/// Keyed store of pending events shared by the chat room components.
///
/// Persistent names live in latest-value cells, everything else in pending
/// slots. Every mutation bumps [`EventContext::revision`] and is broadcast to
/// subscribers.
pub struct EventContext {
    latest: HashMap<EventName, LatestCell>,
    pending: HashMap<EventName, PendingSlot>,
    versions: HashMap<EventName, u64>,
    revision: u64,
    tx: broadcast::Sender<BusChange>,
}

impl EventContext {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            latest: HashMap::new(),
            pending: HashMap::new(),
            versions: HashMap::new(),
            revision: 0,
            tx,
        }
    }

    /// Store `payload` under `name`, overwriting any previous event.
    ///
    /// Returns the new version of `name`.
    pub fn add_event(&mut self, name: EventName, payload: EventPayload) -> Result<u64> {
        payload.validate(name)?;

        let version = {
            let v = self.versions.entry(name).or_insert(0);
            *v += 1;
            *v
        };
        let event = Event {
            name,
            payload,
            version,
        };

        if name.is_persistent() {
            self.latest.entry(name).or_default().set(event);
        } else if let Some(previous) = self.pending.entry(name).or_default().put(event) {
            debug!(
                "Overwrote unacknowledged {} v{} with v{}",
                name, previous.version, version
            );
        }

        debug!("Added {} v{}", name, version);
        self.bump(BusChange::Added { name, version });
        Ok(version)
    }

    /// Decode a wire payload and add it
    pub fn add_json_event(&mut self, name: &str, value: serde_json::Value) -> Result<u64> {
        let name: EventName = name.parse()?;
        let payload = EventPayload::from_json(name, value)?;
        self.add_event(name, payload)
    }

    pub fn get_event(&self, name: EventName) -> Option<&Event> {
        if name.is_persistent() {
            self.latest.get(&name).and_then(LatestCell::get)
        } else {
            self.pending.get(&name).and_then(PendingSlot::peek)
        }
    }

    /// Current payload for `name`, without consuming it
    pub fn get_event_data(&self, name: EventName) -> Option<&EventPayload> {
        self.get_event(name).map(|e| &e.payload)
    }

    /// Acknowledge a transient event. Persistent cells are never cleared.
    pub fn remove_event(&mut self, name: EventName) -> bool {
        self.take_event(name).is_some()
    }

    /// Read and acknowledge a transient event in one step
    pub fn take_event(&mut self, name: EventName) -> Option<Event> {
        if name.is_persistent() {
            debug!("Ignoring removal of persistent event {}", name);
            return None;
        }
        let event = self.pending.get_mut(&name).and_then(PendingSlot::take)?;
        debug!("Removed {} v{}", name, event.version);
        self.bump(BusChange::Removed { name });
        Some(event)
    }

    /// Names with an unacknowledged transient event, in declaration order
    pub fn pending_names(&self) -> Vec<EventName> {
        let mut names: Vec<EventName> = self
            .pending
            .iter()
            .filter(|(_, slot)| slot.peek().is_some())
            .map(|(name, _)| *name)
            .collect();
        names.sort();
        names
    }

    /// Incremented on every add or removal
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusChange> {
        self.tx.subscribe()
    }

    fn bump(&mut self, change: BusChange) {
        self.revision += 1;
        if self.tx.receiver_count() > 0 {
            // Lagging receivers see RecvError::Lagged; nothing to do here.
            let _ = self.tx.send(change);
        }
    }
}

impl Default for EventContext {
    fn default() -> Self {
        Self::new()
    }
}
