/// Chat room: owns the bus and the components that reconcile against it
use crate::bus::{Event, EventContext, EventName, EventPayload, Reconciler};
use crate::chat_types::{CurrentUser, Message};
use crate::config::{Config, DEFAULT_MAX_PASSES};
use crate::directory::{Contact, ContactDirectory, Highlight};
use crate::error::{ChatError, Result};
use crate::friend_request::{FriendRequestResolver, Resolution};
use crate::message_log::MessageLog;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Resolver,
    Directory,
    Log,
}

/// Serializable view of the room for output
#[derive(Debug, Clone, Serialize)]
pub struct RoomSnapshot {
    pub current_user: Option<CurrentUser>,
    pub contacts: Vec<ContactView>,
    pub selected: Option<String>,
    pub search_term: String,
    pub messages: Vec<Message>,
    pub pending_request: Option<String>,
    pub unacknowledged: Vec<EventName>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactView {
    #[serde(flatten)]
    pub contact: Contact,
    pub highlight: Highlight,
    pub visible: bool,
}

pub struct ChatRoom {
    bus: EventContext,
    resolver: Option<FriendRequestResolver>,
    directory: Option<ContactDirectory>,
    log: Option<MessageLog>,
    max_passes: usize,
}

impl ChatRoom {
    /// Room with every component mounted
    pub fn new() -> Self {
        Self::with_max_passes(DEFAULT_MAX_PASSES)
    }

    pub fn with_max_passes(max_passes: usize) -> Self {
        Self {
            bus: EventContext::new(),
            resolver: Some(FriendRequestResolver::new()),
            directory: Some(ContactDirectory::new()),
            log: Some(MessageLog::new()),
            max_passes: max_passes.max(1),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_max_passes(config.max_passes)
    }

    pub fn bus(&self) -> &EventContext {
        &self.bus
    }

    /// Direct bus access for producers; call [`ChatRoom::settle`] afterwards.
    pub fn bus_mut(&mut self) -> &mut EventContext {
        &mut self.bus
    }

    pub fn directory(&self) -> Option<&ContactDirectory> {
        self.directory.as_ref()
    }

    pub fn log(&self) -> Option<&MessageLog> {
        self.log.as_ref()
    }

    pub fn log_mut(&mut self) -> Option<&mut MessageLog> {
        self.log.as_mut()
    }

    pub fn resolver(&self) -> Option<&FriendRequestResolver> {
        self.resolver.as_ref()
    }

    pub fn is_mounted(&self, component: Component) -> bool {
        match component {
            Component::Resolver => self.resolver.is_some(),
            Component::Directory => self.directory.is_some(),
            Component::Log => self.log.is_some(),
        }
    }

    /// Producer entry point: add an event and let every component react
    pub fn deliver(&mut self, name: EventName, payload: EventPayload) -> Result<usize> {
        self.bus.add_event(name, payload)?;
        self.settle()
    }

    pub fn deliver_json(&mut self, name: &str, value: serde_json::Value) -> Result<usize> {
        self.bus.add_json_event(name, value)?;
        self.settle()
    }

    /// Run reconciliation passes until one leaves the bus untouched.
    ///
    /// Up to `max_passes` passes may change the bus; the closing quiet pass
    /// is not counted. Returns the number of passes that changed the bus.
    pub fn settle(&mut self) -> Result<usize> {
        for pass in 0..=self.max_passes {
            let before = self.bus.revision();
            self.reconcile_pass()?;
            if self.bus.revision() == before {
                return Ok(pass);
            }
        }
        warn!("Bus still changing after {} passes", self.max_passes);
        Err(ChatError::Unsettled {
            passes: self.max_passes,
        })
    }

    fn reconcile_pass(&mut self) -> Result<()> {
        if let Some(resolver) = self.resolver.as_mut() {
            resolver.reconcile(&mut self.bus)?;
        }
        if let Some(directory) = self.directory.as_mut() {
            directory.reconcile(&mut self.bus)?;
        }
        if let Some(log) = self.log.as_mut() {
            log.reconcile(&mut self.bus)?;
        }
        Ok(())
    }

    /// Mount a fresh component. Events left on the bus while it was absent
    /// are picked up immediately.
    pub fn mount(&mut self, component: Component) -> Result<bool> {
        if self.is_mounted(component) {
            return Ok(false);
        }
        match component {
            Component::Resolver => self.resolver = Some(FriendRequestResolver::new()),
            Component::Directory => self.directory = Some(ContactDirectory::new()),
            Component::Log => self.log = Some(MessageLog::new()),
        }
        debug!("Mounted {:?}", component);
        self.settle()?;
        Ok(true)
    }

    /// Drop a component and its local state. Its unacknowledged events stay
    /// on the bus.
    pub fn unmount(&mut self, component: Component) -> bool {
        let was_mounted = match component {
            Component::Resolver => self.resolver.take().is_some(),
            Component::Directory => self.directory.take().is_some(),
            Component::Log => self.log.take().is_some(),
        };
        if was_mounted {
            debug!("Unmounted {:?}", component);
        }
        was_mounted
    }

    pub fn accept_request(&mut self) -> Result<Resolution> {
        self.resolve_request(Resolution::Accepted)
    }

    pub fn reject_request(&mut self) -> Result<Resolution> {
        self.resolve_request(Resolution::Rejected)
    }

    fn resolve_request(&mut self, resolution: Resolution) -> Result<Resolution> {
        let resolver = self.resolver.as_mut().ok_or(ChatError::NoPendingRequest)?;
        let resolution = resolver.resolve(&mut self.bus, resolution)?;
        self.settle()?;
        Ok(resolution)
    }

    pub fn select_contact(&mut self, identity: &str) -> Result<bool> {
        let Some(directory) = self.directory.as_mut() else {
            return Ok(false);
        };
        let selected = directory.select(&mut self.bus, identity)?;
        self.settle()?;
        Ok(selected)
    }

    /// Delete from the contact list (context menu action)
    pub fn delete_contact(&mut self, identity: &str) -> Result<bool> {
        let Some(directory) = self.directory.as_mut() else {
            return Ok(false);
        };
        let Some(is_group) = directory.get(identity).map(|c| c.is_group) else {
            return Ok(false);
        };
        let deleted = directory.delete_contact(&mut self.bus, identity, is_group)?;
        self.settle()?;
        Ok(deleted)
    }

    pub fn search(&mut self, term: &str) {
        if let Some(directory) = self.directory.as_mut() {
            directory.search(term);
        }
    }

    pub fn clear_search(&mut self) {
        if let Some(directory) = self.directory.as_mut() {
            directory.clear_search();
        }
    }

    /// Local send: publish a message written by the current user
    pub fn send_text(&mut self, text: &str) -> Result<Message> {
        let sender = match self.bus.get_event_data(EventName::ShowUserInfo) {
            Some(EventPayload::UserInfo(user)) => Some(user.nickname.clone()),
            _ => None,
        };
        let message = Message::new(Uuid::new_v4().to_string(), text, sender);
        self.deliver(
            EventName::ShowMessageToSend,
            EventPayload::Message(message.clone()),
        )?;
        Ok(message)
    }

    /// Take every outbound event off the bus, as the transport would
    pub fn take_outbound(&mut self) -> Vec<Event> {
        let names: Vec<EventName> = self
            .bus
            .pending_names()
            .into_iter()
            .filter(EventName::is_outbound)
            .collect();
        names
            .into_iter()
            .filter_map(|name| self.bus.take_event(name))
            .collect()
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        let current_user = match self.bus.get_event_data(EventName::ShowUserInfo) {
            Some(EventPayload::UserInfo(user)) => Some(user.clone()),
            _ => None,
        };

        let contacts = self
            .directory
            .as_ref()
            .map(|dir| {
                let visible = dir.visible();
                dir.contacts()
                    .iter()
                    .map(|c| ContactView {
                        contact: c.clone(),
                        highlight: dir.highlight_of(c),
                        visible: visible.iter().any(|v| v.identity == c.identity),
                    })
                    .collect()
            })
            .unwrap_or_default();

        RoomSnapshot {
            current_user,
            contacts,
            selected: self
                .directory
                .as_ref()
                .and_then(|d| d.selected().map(str::to_string)),
            search_term: self
                .directory
                .as_ref()
                .map(|d| d.search_term().to_string())
                .unwrap_or_default(),
            messages: self
                .log
                .as_ref()
                .map(|l| l.messages().to_vec())
                .unwrap_or_default(),
            pending_request: self
                .resolver
                .as_ref()
                .and_then(FriendRequestResolver::prompt),
            unacknowledged: self.bus.pending_names(),
        }
    }
}

impl Default for ChatRoom {
    fn default() -> Self {
        Self::new()
    }
}
