/// Contact directory: the ordered, searchable list of contacts and groups
use crate::bus::{EventContext, EventName, EventPayload, Reconciler};
use crate::chat_types::{CurrentUser, FriendRequest, RawContactRecord, RelationshipState, SelectedChat};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Unique display name
    pub identity: String,
    pub image_ref: Option<String>,
    /// `None` when no friend request backs the entry (e.g. groups)
    pub relationship: Option<RelationshipState>,
    pub is_group: bool,
}

impl Contact {
    /// Normalize a transport record. Records without a name yield `None`.
    pub fn from_raw(raw: &RawContactRecord) -> Option<Self> {
        let identity = raw.identity()?;
        Some(Self {
            identity: identity.to_string(),
            image_ref: raw.image_ref().map(str::to_string),
            relationship: raw.relationship_state(),
            is_group: raw.is_group,
        })
    }
}

/// Background treatment of a contact row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Highlight {
    Selected,
    Pending,
    Rejected,
    Plain,
}

pub fn highlight(relationship: Option<RelationshipState>, selected: bool) -> Highlight {
    if selected {
        return Highlight::Selected;
    }
    match relationship {
        Some(RelationshipState::Pending) => Highlight::Pending,
        Some(RelationshipState::Rejected) => Highlight::Rejected,
        Some(RelationshipState::Accepted) | None => Highlight::Plain,
    }
}

/// Badge shown next to the name; only unresolved or refused requests get one
pub fn status_badge(relationship: Option<RelationshipState>) -> Option<RelationshipState> {
    relationship.filter(|r| *r != RelationshipState::Accepted)
}

#[derive(Debug, Default)]
pub struct ContactDirectory {
    contacts: Vec<Contact>,
    search_term: String,
    selected: Option<String>,
    current_user: Option<CurrentUser>,
}

impl ContactDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize and append a raw record.
    ///
    /// Returns false for nameless records and for identities already listed.
    pub fn add_contact(&mut self, raw: &RawContactRecord) -> bool {
        match Contact::from_raw(raw) {
            Some(contact) => self.insert(contact),
            None => {
                debug!("Skipping contact record without a name");
                false
            }
        }
    }

    pub fn insert(&mut self, contact: Contact) -> bool {
        if self.get(&contact.identity).is_some() {
            warn!("Contact {} is already listed, ignoring duplicate", contact.identity);
            return false;
        }
        debug!("Listed contact {}", contact.identity);
        self.contacts.push(contact);
        true
    }

    /// Remove the first entry named `identity` and tell the transport.
    pub fn delete_contact(
        &mut self,
        bus: &mut EventContext,
        identity: &str,
        is_group: bool,
    ) -> Result<bool> {
        let Some(index) = self.contacts.iter().position(|c| c.identity == identity) else {
            debug!("Delete of unknown contact {}", identity);
            return Ok(false);
        };

        let notice = if is_group {
            EventName::DeleteGroup
        } else {
            EventName::DeleteContact
        };
        bus.add_event(notice, EventPayload::Identity(identity.to_string()))?;

        self.contacts.remove(index);
        if self.selected.as_deref() == Some(identity) {
            self.selected = None;
        }
        debug!("Deleted contact {}", identity);
        Ok(true)
    }

    /// Move the pending contact on the other side of `request` to `new_status`.
    ///
    /// Contacts that are not pending, or that the request does not point at
    /// from the current user's side, are left alone. Returns how many entries
    /// changed.
    pub fn update_contact_status(
        &mut self,
        request: &FriendRequest,
        new_status: RelationshipState,
    ) -> usize {
        let Some(user) = self.current_user.as_ref() else {
            debug!("No current user yet, dropping status update");
            return 0;
        };
        let Some(counterpart) = request.counterpart(&user.nickname) else {
            debug!(
                "Request {} -> {} does not involve {}",
                request.from_user, request.to_user, user.nickname
            );
            return 0;
        };

        let mut changed = 0;
        for contact in self.contacts.iter_mut() {
            if contact.identity == counterpart
                && contact.relationship == Some(RelationshipState::Pending)
            {
                contact.relationship = Some(new_status);
                changed += 1;
            }
        }
        if changed == 0 {
            debug!("Stale status update for {}", counterpart);
        }
        changed
    }

    /// Open the conversation with `identity`.
    ///
    /// Emits `selected_chat` plus the private/group variant unless the
    /// contact is already selected.
    pub fn select(&mut self, bus: &mut EventContext, identity: &str) -> Result<bool> {
        if self.selected.as_deref() == Some(identity) {
            return Ok(false);
        }
        let Some(contact) = self.get(identity) else {
            return Ok(false);
        };

        let selection = SelectedChat {
            contact_name: contact.identity.clone(),
            contact_status: contact.relationship,
        };
        let specific = if contact.is_group {
            EventName::SelectedGroupChat
        } else {
            EventName::SelectedPrivateChat
        };
        bus.add_event(EventName::SelectedChat, EventPayload::Selection(selection.clone()))?;
        bus.add_event(specific, EventPayload::Selection(selection))?;

        self.selected = Some(identity.to_string());
        Ok(true)
    }

    pub fn search(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
    }

    pub fn clear_search(&mut self) {
        self.search_term.clear();
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    /// Contacts matching the search term, in insertion order
    pub fn visible(&self) -> Vec<&Contact> {
        let needle = self.search_term.to_lowercase();
        self.contacts
            .iter()
            .filter(|c| c.identity.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn get(&self, identity: &str) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.identity == identity)
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn current_user(&self) -> Option<&CurrentUser> {
        self.current_user.as_ref()
    }

    pub fn set_current_user(&mut self, user: CurrentUser) {
        self.current_user = Some(user);
    }

    pub fn highlight_of(&self, contact: &Contact) -> Highlight {
        highlight(
            contact.relationship,
            self.selected.as_deref() == Some(contact.identity.as_str()),
        )
    }
}

impl Reconciler for ContactDirectory {
    fn reconcile(&mut self, bus: &mut EventContext) -> Result<bool> {
        let mut changed = false;

        if let Some(EventPayload::UserInfo(user)) = bus.get_event_data(EventName::ShowUserInfo) {
            if self.current_user.as_ref() != Some(user) {
                self.current_user = Some(user.clone());
                changed = true;
            }
        }

        if let Some(event) = bus.take_event(EventName::AddContactToList) {
            if let EventPayload::Contact(raw) = &event.payload {
                changed |= self.add_contact(raw);
            }
        }

        if let Some(event) = bus.take_event(EventName::ShowListContact) {
            if let EventPayload::ContactList(records) = &event.payload {
                for raw in records {
                    changed |= self.add_contact(raw);
                }
            }
        }

        if let Some(event) = bus.take_event(EventName::DeleteRejectedContact) {
            if let EventPayload::Identity(identity) = &event.payload {
                changed |= self.delete_contact(bus, identity, false)?;
            }
        }

        if let Some(event) = bus.take_event(EventName::UpdateContactStatus) {
            if let EventPayload::ContactStatus(update) = &event.payload {
                changed |= self.update_contact_status(&update.request, update.new_status) > 0;
            }
        }

        if let Some(event) = bus.take_event(EventName::AddGroupToList) {
            if let EventPayload::Contact(raw) = &event.payload {
                changed |= self.add_contact(raw);
            }
        }

        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(name: &str) -> RawContactRecord {
        RawContactRecord::contact(name, None, Some(RelationshipState::Pending))
    }

    fn directory_for(user: &str) -> ContactDirectory {
        let mut dir = ContactDirectory::new();
        dir.set_current_user(CurrentUser::new(user));
        dir
    }

    #[test]
    fn test_add_preserves_order_and_rejects_duplicates() {
        let mut dir = ContactDirectory::new();
        assert!(dir.add_contact(&pending("bob")));
        assert!(dir.add_contact(&RawContactRecord::group("climbers", None)));
        assert!(!dir.add_contact(&pending("bob")));
        assert!(!dir.add_contact(&RawContactRecord::default()));

        let names: Vec<_> = dir.contacts().iter().map(|c| c.identity.as_str()).collect();
        assert_eq!(names, vec!["bob", "climbers"]);
        assert!(dir.get("climbers").unwrap().is_group);
    }

    #[test]
    fn test_received_request_accepts_sender() {
        let mut dir = directory_for("me");
        dir.add_contact(&pending("bob"));

        let changed =
            dir.update_contact_status(&FriendRequest::new("bob", "me"), RelationshipState::Accepted);
        assert_eq!(changed, 1);
        assert_eq!(
            dir.get("bob").unwrap().relationship,
            Some(RelationshipState::Accepted)
        );
    }

    #[test]
    fn test_sent_request_targets_receiver_only() {
        let mut dir = directory_for("b");
        dir.add_contact(&pending("a"));
        dir.add_contact(&pending("b"));

        let changed =
            dir.update_contact_status(&FriendRequest::new("a", "b"), RelationshipState::Rejected);
        assert_eq!(changed, 1);
        assert_eq!(dir.get("a").unwrap().relationship, Some(RelationshipState::Rejected));
        assert_eq!(dir.get("b").unwrap().relationship, Some(RelationshipState::Pending));
    }

    #[test]
    fn test_resolved_contacts_ignore_status_updates() {
        let mut dir = directory_for("me");
        dir.add_contact(&RawContactRecord::contact(
            "bob",
            None,
            Some(RelationshipState::Accepted),
        ));
        dir.add_contact(&RawContactRecord::contact(
            "eve",
            None,
            Some(RelationshipState::Rejected),
        ));

        for (from, status) in [
            ("bob", RelationshipState::Rejected),
            ("eve", RelationshipState::Accepted),
            ("eve", RelationshipState::Pending),
        ] {
            assert_eq!(dir.update_contact_status(&FriendRequest::new(from, "me"), status), 0);
        }
        assert_eq!(dir.get("bob").unwrap().relationship, Some(RelationshipState::Accepted));
        assert_eq!(dir.get("eve").unwrap().relationship, Some(RelationshipState::Rejected));
    }

    #[test]
    fn test_status_update_needs_current_user_on_the_request() {
        let mut dir = ContactDirectory::new();
        dir.add_contact(&pending("bob"));
        let request = FriendRequest::new("bob", "me");
        assert_eq!(dir.update_contact_status(&request, RelationshipState::Accepted), 0);

        dir.set_current_user(CurrentUser::new("someone-else"));
        assert_eq!(dir.update_contact_status(&request, RelationshipState::Accepted), 0);
        assert_eq!(dir.get("bob").unwrap().relationship, Some(RelationshipState::Pending));
    }

    #[test]
    fn test_delete_emits_notice_and_clears_selection() {
        let mut bus = EventContext::new();
        let mut dir = ContactDirectory::new();
        dir.add_contact(&pending("bob"));
        dir.add_contact(&RawContactRecord::group("climbers", None));
        dir.select(&mut bus, "bob").unwrap();

        assert!(dir.delete_contact(&mut bus, "bob", false).unwrap());
        assert_eq!(dir.contacts().len(), 1);
        assert_eq!(dir.selected(), None);
        assert_eq!(
            bus.get_event_data(EventName::DeleteContact),
            Some(&EventPayload::Identity("bob".to_string()))
        );

        assert!(dir.delete_contact(&mut bus, "climbers", true).unwrap());
        assert_eq!(
            bus.get_event_data(EventName::DeleteGroup),
            Some(&EventPayload::Identity("climbers".to_string()))
        );
    }

    #[test]
    fn test_delete_unknown_is_silent() {
        let mut bus = EventContext::new();
        let mut dir = ContactDirectory::new();
        dir.add_contact(&pending("bob"));
        assert!(!dir.delete_contact(&mut bus, "nobody", false).unwrap());
        assert_eq!(dir.contacts().len(), 1);
        assert_eq!(bus.revision(), 0);
    }

    #[test]
    fn test_delete_keeps_unrelated_selection() {
        let mut bus = EventContext::new();
        let mut dir = ContactDirectory::new();
        dir.add_contact(&pending("bob"));
        dir.add_contact(&pending("eve"));
        dir.select(&mut bus, "eve").unwrap();
        dir.delete_contact(&mut bus, "bob", false).unwrap();
        assert_eq!(dir.selected(), Some("eve"));
    }

    #[test]
    fn test_search_is_case_insensitive_and_non_destructive() {
        let mut dir = ContactDirectory::new();
        for name in ["Bobby", "alice", "BOB", "carol"] {
            dir.add_contact(&pending(name));
        }
        dir.search("bOb");
        let names: Vec<_> = dir.visible().iter().map(|c| c.identity.as_str()).collect();
        assert_eq!(names, vec!["Bobby", "BOB"]);
        assert_eq!(dir.contacts().len(), 4);

        // Filter follows collection changes without re-searching
        dir.add_contact(&pending("jimbob"));
        assert_eq!(dir.visible().len(), 3);

        dir.clear_search();
        assert_eq!(dir.visible().len(), 5);
    }

    #[test]
    fn test_select_emits_once() {
        let mut bus = EventContext::new();
        let mut dir = ContactDirectory::new();
        dir.add_contact(&pending("bob"));
        dir.add_contact(&RawContactRecord::group("climbers", None));

        assert!(dir.select(&mut bus, "bob").unwrap());
        assert!(!dir.select(&mut bus, "bob").unwrap());
        assert_eq!(bus.get_event(EventName::SelectedChat).unwrap().version, 1);
        assert_eq!(
            bus.get_event_data(EventName::SelectedPrivateChat),
            Some(&EventPayload::Selection(SelectedChat {
                contact_name: "bob".to_string(),
                contact_status: Some(RelationshipState::Pending),
            }))
        );

        assert!(dir.select(&mut bus, "climbers").unwrap());
        assert!(bus.get_event(EventName::SelectedGroupChat).is_some());
        assert!(!dir.select(&mut bus, "nobody").unwrap());
        assert_eq!(dir.selected(), Some("climbers"));
    }

    #[test]
    fn test_highlight_is_total() {
        use RelationshipState::*;
        assert_eq!(highlight(Some(Pending), true), Highlight::Selected);
        assert_eq!(highlight(None, true), Highlight::Selected);
        assert_eq!(highlight(Some(Pending), false), Highlight::Pending);
        assert_eq!(highlight(Some(Rejected), false), Highlight::Rejected);
        assert_eq!(highlight(Some(Accepted), false), Highlight::Plain);
        assert_eq!(highlight(None, false), Highlight::Plain);

        assert_eq!(status_badge(Some(Pending)), Some(Pending));
        assert_eq!(status_badge(Some(Rejected)), Some(Rejected));
        assert_eq!(status_badge(Some(Accepted)), None);
        assert_eq!(status_badge(None), None);
    }

    #[test]
    fn test_reconcile_consumes_directory_events() {
        let mut bus = EventContext::new();
        let mut dir = ContactDirectory::new();

        bus.add_event(
            EventName::ShowUserInfo,
            EventPayload::UserInfo(CurrentUser::new("me")),
        )
        .unwrap();
        bus.add_event(
            EventName::ShowListContact,
            EventPayload::ContactList(vec![pending("bob"), pending("eve")]),
        )
        .unwrap();
        bus.add_event(
            EventName::AddGroupToList,
            EventPayload::Contact(RawContactRecord::group("climbers", None)),
        )
        .unwrap();

        assert!(dir.reconcile(&mut bus).unwrap());
        assert_eq!(dir.contacts().len(), 3);
        assert_eq!(dir.current_user().unwrap().nickname, "me");
        assert!(bus.pending_names().is_empty());
        assert!(bus.get_event_data(EventName::ShowUserInfo).is_some());

        bus.add_event(
            EventName::DeleteRejectedContact,
            EventPayload::Identity("eve".to_string()),
        )
        .unwrap();
        assert!(dir.reconcile(&mut bus).unwrap());
        assert!(dir.get("eve").is_none());
        // The removal is forwarded to the transport
        assert_eq!(bus.pending_names(), vec![EventName::DeleteContact]);

        // Nothing left to fold
        assert!(!dir.reconcile(&mut bus).unwrap());
    }
}
