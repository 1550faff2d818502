/// Friend request resolution: accept or reject the request currently on screen
use crate::bus::{Event, EventContext, EventName, EventPayload, Reconciler};
use crate::chat_types::{ContactStatusUpdate, FriendRequest, RelationshipState, StatusUpdateRequest};
use crate::error::{ChatError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Accepted,
    Rejected,
}

impl From<Resolution> for RelationshipState {
    fn from(resolution: Resolution) -> Self {
        match resolution {
            Resolution::Accepted => RelationshipState::Accepted,
            Resolution::Rejected => RelationshipState::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResolverState {
    /// Nothing received yet
    #[default]
    Waiting,
    Open(FriendRequest),
    Resolved(Resolution),
}

#[derive(Debug, Default)]
pub struct FriendRequestResolver {
    state: ResolverState,
}

impl FriendRequestResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ResolverState {
        &self.state
    }

    pub fn request(&self) -> Option<&FriendRequest> {
        match &self.state {
            ResolverState::Open(request) => Some(request),
            _ => None,
        }
    }

    /// Show `request`. A newer request replaces whatever was on screen.
    pub fn open(&mut self, request: FriendRequest) {
        debug!("Friend request from {} opened", request.from_user);
        self.state = ResolverState::Open(request);
    }

    /// Text shown to the user while the request is open
    pub fn prompt(&self) -> Option<String> {
        self.request()
            .map(|r| format!("{} sent you a friend request.", r.from_user))
    }

    /// Resolve the open request.
    ///
    /// Emits `update_status_request` for the transport and
    /// `update_contact_status` for the contact directory, then forgets the
    /// request.
    pub fn resolve(&mut self, bus: &mut EventContext, resolution: Resolution) -> Result<Resolution> {
        let Some(request) = self.request().cloned() else {
            return Err(ChatError::NoPendingRequest);
        };
        let new_status = RelationshipState::from(resolution);

        let notice = StatusUpdateRequest {
            status: new_status,
            contact_name: request.to_user.clone(),
            from_user_name: request.from_user.clone(),
        };
        bus.add_event(EventName::UpdateStatusRequest, EventPayload::StatusRequest(notice))?;

        info!(
            "Friend request {} -> {} {}",
            request.from_user, request.to_user, new_status
        );
        bus.add_event(
            EventName::UpdateContactStatus,
            EventPayload::ContactStatus(ContactStatusUpdate {
                request,
                new_status,
            }),
        )?;

        self.state = ResolverState::Resolved(resolution);
        Ok(resolution)
    }

    pub fn accept(&mut self, bus: &mut EventContext) -> Result<Resolution> {
        self.resolve(bus, Resolution::Accepted)
    }

    pub fn reject(&mut self, bus: &mut EventContext) -> Result<Resolution> {
        self.resolve(bus, Resolution::Rejected)
    }
}

impl Reconciler for FriendRequestResolver {
    fn reconcile(&mut self, bus: &mut EventContext) -> Result<bool> {
        match bus.take_event(EventName::OpenChatRequestReceived) {
            Some(Event {
                payload: EventPayload::FriendRequest(request),
                ..
            }) => {
                self.open(request);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
