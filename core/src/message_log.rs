/// Message log for the active conversation
use crate::bus::{EventContext, EventName, EventPayload, Reconciler};
use crate::chat_types::{CurrentUser, Message};
use crate::error::Result;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

type ChangeListener = Box<dyn FnMut(&[Message])>;

/// Ordered, append-only log of the open conversation.
///
/// Listeners run synchronously after every mutation, which is what keeps the
/// viewport pinned to the latest message.
#[derive(Default)]
pub struct MessageLog {
    messages: Vec<Message>,
    current_user: Option<CurrentUser>,
    listeners: Vec<ChangeListener>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole log, e.g. when a conversation is opened.
    /// Blank messages are dropped, and a repeated `public_id` keeps its first
    /// entry.
    pub fn load_snapshot(&mut self, list: Vec<Message>) {
        let total = list.len();
        let mut seen = HashSet::new();
        self.messages = list
            .into_iter()
            .filter(|m| !m.is_blank() && seen.insert(m.public_id.clone()))
            .collect();
        if self.messages.len() < total {
            debug!(
                "Dropped {} blank or repeated messages from snapshot",
                total - self.messages.len()
            );
        }
        self.notify();
    }

    /// Append one message. Absent, blank and already-logged messages are
    /// rejected.
    pub fn append_message(&mut self, message: Option<Message>) -> bool {
        let Some(message) = message else {
            return false;
        };
        if message.is_blank() {
            debug!("Rejected blank message {}", message.public_id);
            return false;
        }
        if self.messages.iter().any(|m| m.public_id == message.public_id) {
            debug!("Message {} already logged", message.public_id);
            return false;
        }
        self.messages.push(message);
        self.notify();
        true
    }

    /// Register a listener called with the full log after each change
    pub fn on_change(&mut self, listener: impl FnMut(&[Message]) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Scroll anchor
    pub fn latest(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Written by the current user
    pub fn is_outgoing(&self, message: &Message) -> bool {
        match (&self.current_user, &message.sender) {
            (Some(user), Some(sender)) => user.nickname == *sender,
            _ => false,
        }
    }

    fn notify(&mut self) {
        for listener in self.listeners.iter_mut() {
            listener(&self.messages);
        }
    }
}

impl fmt::Debug for MessageLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageLog")
            .field("messages", &self.messages)
            .field("current_user", &self.current_user)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Reconciler for MessageLog {
    fn reconcile(&mut self, bus: &mut EventContext) -> Result<bool> {
        let mut changed = false;

        if let Some(event) = bus.take_event(EventName::ShowListMessages) {
            if let EventPayload::MessageList(list) = event.payload {
                self.load_snapshot(list);
                changed = true;
            }
        }

        if let Some(event) = bus.take_event(EventName::ShowMessageToSend) {
            if let EventPayload::Message(message) = event.payload {
                changed |= self.append_message(Some(message));
            }
        }

        if let Some(EventPayload::UserInfo(user)) = bus.get_event_data(EventName::ShowUserInfo) {
            if self.current_user.as_ref() != Some(user) {
                self.current_user = Some(user.clone());
                changed = true;
            }
        }

        Ok(changed)
    }
}
