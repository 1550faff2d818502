/// Event names and typed payloads
use crate::chat_types::{
    ContactStatusUpdate, CurrentUser, FriendRequest, Message, RawContactRecord, SelectedChat,
    StatusUpdateRequest,
};
use crate::error::{ChatError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every event name the bus accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventName {
    ShowListMessages,
    ShowMessageToSend,
    ShowUserInfo,
    OpenChatRequestReceived,
    UpdateStatusRequest,
    UpdateContactStatus,
    AddContactToList,
    AddGroupToList,
    ShowListContact,
    DeleteRejectedContact,
    DeleteContact,
    DeleteGroup,
    SelectedChat,
    SelectedPrivateChat,
    SelectedGroupChat,
}

impl EventName {
    pub const ALL: [EventName; 15] = [
        EventName::ShowListMessages,
        EventName::ShowMessageToSend,
        EventName::ShowUserInfo,
        EventName::OpenChatRequestReceived,
        EventName::UpdateStatusRequest,
        EventName::UpdateContactStatus,
        EventName::AddContactToList,
        EventName::AddGroupToList,
        EventName::ShowListContact,
        EventName::DeleteRejectedContact,
        EventName::DeleteContact,
        EventName::DeleteGroup,
        EventName::SelectedChat,
        EventName::SelectedPrivateChat,
        EventName::SelectedGroupChat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::ShowListMessages => "show_list_messages",
            EventName::ShowMessageToSend => "show_message_to_send",
            EventName::ShowUserInfo => "show_user_info",
            EventName::OpenChatRequestReceived => "open_chat_request_received",
            EventName::UpdateStatusRequest => "update_status_request",
            EventName::UpdateContactStatus => "update_contact_status",
            EventName::AddContactToList => "add_contact_to_list",
            EventName::AddGroupToList => "add_group_to_list",
            EventName::ShowListContact => "show_list_contact",
            EventName::DeleteRejectedContact => "delete_rejected_contact",
            EventName::DeleteContact => "delete_contact",
            EventName::DeleteGroup => "delete_group",
            EventName::SelectedChat => "selected_chat",
            EventName::SelectedPrivateChat => "selected_private_chat",
            EventName::SelectedGroupChat => "selected_group_chat",
        }
    }

    /// Latest-value events stay readable until overwritten
    pub fn is_persistent(&self) -> bool {
        matches!(self, EventName::ShowUserInfo)
    }

    /// Events emitted by local components for the transport to pick up
    pub fn is_outbound(&self) -> bool {
        matches!(
            self,
            EventName::UpdateStatusRequest
                | EventName::DeleteContact
                | EventName::DeleteGroup
                | EventName::SelectedChat
                | EventName::SelectedPrivateChat
                | EventName::SelectedGroupChat
        )
    }

    /// Payload shape this event carries
    pub fn shape(&self) -> PayloadShape {
        match self {
            EventName::ShowListMessages => PayloadShape::MessageList,
            EventName::ShowMessageToSend => PayloadShape::Message,
            EventName::ShowUserInfo => PayloadShape::UserInfo,
            EventName::OpenChatRequestReceived => PayloadShape::FriendRequest,
            EventName::UpdateStatusRequest => PayloadShape::StatusRequest,
            EventName::UpdateContactStatus => PayloadShape::ContactStatus,
            EventName::AddContactToList | EventName::AddGroupToList => PayloadShape::Contact,
            EventName::ShowListContact => PayloadShape::ContactList,
            EventName::DeleteRejectedContact | EventName::DeleteContact | EventName::DeleteGroup => {
                PayloadShape::Identity
            }
            EventName::SelectedChat
            | EventName::SelectedPrivateChat
            | EventName::SelectedGroupChat => PayloadShape::Selection,
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventName {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self> {
        EventName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| ChatError::UnknownEvent(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    MessageList,
    Message,
    UserInfo,
    FriendRequest,
    StatusRequest,
    ContactStatus,
    Contact,
    ContactList,
    Identity,
    Selection,
}

impl PayloadShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadShape::MessageList => "message list",
            PayloadShape::Message => "message",
            PayloadShape::UserInfo => "user info",
            PayloadShape::FriendRequest => "friend request",
            PayloadShape::StatusRequest => "status request",
            PayloadShape::ContactStatus => "contact status",
            PayloadShape::Contact => "contact",
            PayloadShape::ContactList => "contact list",
            PayloadShape::Identity => "identity",
            PayloadShape::Selection => "selection",
        }
    }
}

/// Payload of a bus event, one variant per shape
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
    MessageList(Vec<Message>),
    Message(Message),
    UserInfo(CurrentUser),
    FriendRequest(FriendRequest),
    StatusRequest(StatusUpdateRequest),
    ContactStatus(ContactStatusUpdate),
    Contact(RawContactRecord),
    ContactList(Vec<RawContactRecord>),
    Identity(String),
    Selection(SelectedChat),
}

impl EventPayload {
    pub fn shape(&self) -> PayloadShape {
        match self {
            EventPayload::MessageList(_) => PayloadShape::MessageList,
            EventPayload::Message(_) => PayloadShape::Message,
            EventPayload::UserInfo(_) => PayloadShape::UserInfo,
            EventPayload::FriendRequest(_) => PayloadShape::FriendRequest,
            EventPayload::StatusRequest(_) => PayloadShape::StatusRequest,
            EventPayload::ContactStatus(_) => PayloadShape::ContactStatus,
            EventPayload::Contact(_) => PayloadShape::Contact,
            EventPayload::ContactList(_) => PayloadShape::ContactList,
            EventPayload::Identity(_) => PayloadShape::Identity,
            EventPayload::Selection(_) => PayloadShape::Selection,
        }
    }

    /// Decode a wire payload for `name`
    pub fn from_json(name: EventName, value: serde_json::Value) -> Result<Self> {
        let payload = match name.shape() {
            PayloadShape::MessageList => EventPayload::MessageList(serde_json::from_value(value)?),
            PayloadShape::Message => EventPayload::Message(serde_json::from_value(value)?),
            PayloadShape::UserInfo => EventPayload::UserInfo(serde_json::from_value(value)?),
            PayloadShape::FriendRequest => {
                EventPayload::FriendRequest(serde_json::from_value(value)?)
            }
            PayloadShape::StatusRequest => {
                EventPayload::StatusRequest(serde_json::from_value(value)?)
            }
            PayloadShape::ContactStatus => {
                EventPayload::ContactStatus(serde_json::from_value(value)?)
            }
            PayloadShape::Contact => EventPayload::Contact(serde_json::from_value(value)?),
            PayloadShape::ContactList => EventPayload::ContactList(serde_json::from_value(value)?),
            PayloadShape::Identity => EventPayload::Identity(serde_json::from_value(value)?),
            PayloadShape::Selection => EventPayload::Selection(serde_json::from_value(value)?),
        };
        Ok(payload)
    }

    /// Check that the payload fits `name` and carries its required fields
    pub fn validate(&self, name: EventName) -> Result<()> {
        if self.shape() != name.shape() {
            return Err(ChatError::PayloadMismatch {
                expected: name.shape().as_str(),
                found: self.shape().as_str(),
            });
        }

        let invalid = |reason: &str| ChatError::InvalidPayload {
            event: name.as_str(),
            reason: reason.to_string(),
        };

        match self {
            EventPayload::MessageList(messages) => {
                if messages.iter().any(|m| m.public_id.is_empty()) {
                    return Err(invalid("message without public_id_msg"));
                }
            }
            EventPayload::Message(message) => {
                if message.public_id.is_empty() {
                    return Err(invalid("message without public_id_msg"));
                }
            }
            EventPayload::UserInfo(user) => {
                if user.nickname.is_empty() {
                    return Err(invalid("user info without nickname"));
                }
            }
            EventPayload::FriendRequest(request)
            | EventPayload::ContactStatus(ContactStatusUpdate { request, .. }) => {
                if request.from_user.is_empty() || request.to_user.is_empty() {
                    return Err(invalid("request needs both from_user and to_user"));
                }
            }
            EventPayload::StatusRequest(update) => {
                if update.contact_name.is_empty() || update.from_user_name.is_empty() {
                    return Err(invalid("status request needs both user names"));
                }
            }
            EventPayload::Contact(record) => {
                if record.identity().is_none() {
                    return Err(invalid("record has neither a nickname nor a group name"));
                }
            }
            EventPayload::ContactList(records) => {
                if records.iter().any(|r| r.identity().is_none()) {
                    return Err(invalid("record has neither a nickname nor a group name"));
                }
            }
            EventPayload::Identity(identity) => {
                if identity.is_empty() {
                    return Err(invalid("empty identity"));
                }
            }
            EventPayload::Selection(selected) => {
                if selected.contact_name.is_empty() {
                    return Err(invalid("selection without contact_name"));
                }
            }
        }
        Ok(())
    }
}
