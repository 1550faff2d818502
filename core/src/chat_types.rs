/// Shared payload types carried over the chat room event bus
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// State of the friend request behind a contact entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipState {
    Pending,
    Accepted,
    Rejected,
}

impl RelationshipState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipState::Pending => "pending",
            RelationshipState::Accepted => "accepted",
            RelationshipState::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RelationshipState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The logged-in user, published once by the transport and never acknowledged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub nickname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_profile: Option<String>,
}

impl CurrentUser {
    pub fn new(nickname: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            image_profile: None,
        }
    }
}

/// One chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "public_id_msg")]
    pub public_id: String,
    #[serde(default)]
    pub text: String,
    /// Nickname of the author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(
        public_id: impl Into<String>,
        text: impl Into<String>,
        sender: Option<String>,
    ) -> Self {
        Self {
            public_id: public_id.into(),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
        }
    }

    /// Empty or whitespace-only text
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A friend request between two users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendRequest {
    pub from_user: String,
    pub to_user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RelationshipState>,
}

impl FriendRequest {
    pub fn new(from_user: impl Into<String>, to_user: impl Into<String>) -> Self {
        Self {
            from_user: from_user.into(),
            to_user: to_user.into(),
            status: None,
        }
    }

    /// The other side of the request as seen by `current_user`.
    ///
    /// Returns `to_user` when the current user sent the request, `from_user`
    /// when they received it, and `None` when they are not part of it.
    pub fn counterpart(&self, current_user: &str) -> Option<&str> {
        if current_user == self.from_user {
            Some(&self.to_user)
        } else if current_user == self.to_user {
            Some(&self.from_user)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContactData {
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub image_profile: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestData {
    #[serde(default)]
    pub status: Option<RelationshipState>,
}

/// Contact or group record as delivered by the transport.
///
/// Contacts carry `contact_data` and usually a `request`; groups carry
/// `group_data` and a top-level `status`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawContactRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_data: Option<ContactData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_data: Option<GroupData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RelationshipState>,
    #[serde(default)]
    pub is_group: bool,
}

impl RawContactRecord {
    pub fn contact(
        nickname: impl Into<String>,
        image_profile: Option<String>,
        status: Option<RelationshipState>,
    ) -> Self {
        Self {
            contact_data: Some(ContactData {
                nickname: Some(nickname.into()),
                image_profile,
            }),
            request: status.map(|s| RequestData { status: Some(s) }),
            ..Default::default()
        }
    }

    pub fn group(name: impl Into<String>, image: Option<String>) -> Self {
        Self {
            group_data: Some(GroupData {
                name: Some(name.into()),
                image,
            }),
            is_group: true,
            ..Default::default()
        }
    }

    /// Display name: the contact nickname, falling back to the group name.
    /// Empty strings count as missing.
    pub fn identity(&self) -> Option<&str> {
        let nickname = self
            .contact_data
            .as_ref()
            .and_then(|c| c.nickname.as_deref());
        let group = self.group_data.as_ref().and_then(|g| g.name.as_deref());
        nickname
            .filter(|n| !n.is_empty())
            .or(group.filter(|n| !n.is_empty()))
    }

    pub fn image_ref(&self) -> Option<&str> {
        let profile = self
            .contact_data
            .as_ref()
            .and_then(|c| c.image_profile.as_deref());
        let group = self.group_data.as_ref().and_then(|g| g.image.as_deref());
        profile
            .filter(|i| !i.is_empty())
            .or(group.filter(|i| !i.is_empty()))
    }

    /// Request status wins over the record-level status
    pub fn relationship_state(&self) -> Option<RelationshipState> {
        self.request
            .as_ref()
            .and_then(|r| r.status)
            .or(self.status)
    }
}

/// Outbound notice that the current user resolved a friend request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: RelationshipState,
    pub contact_name: String,
    pub from_user_name: String,
}

/// Instruction for the contact directory to move a pending contact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactStatusUpdate {
    pub request: FriendRequest,
    pub new_status: RelationshipState,
}

/// Emitted when the user opens a conversation from the contact list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedChat {
    pub contact_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_status: Option<RelationshipState>,
}
