pub mod events;
pub mod rows;

use serde::{Deserialize, Serialize};

/// Backend user identifier (UUID string as issued by the auth system).
pub type UserId = String;
/// Backend chat-room identifier.
pub type RoomId = String;

/// Small display identity for a message sender.
///
/// This is the subset of a profile the message list needs: enough to render
/// a name and an avatar next to a bubble. Cached per `user_id` for the
/// lifetime of a session (cardinality is bounded by distinct senders seen).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderIdentity {
    pub user_id: UserId,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

/// Full profile of another user, as returned by the fetch facade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

impl From<&Profile> for SenderIdentity {
    fn from(profile: &Profile) -> Self {
        Self {
            user_id: profile.user_id.clone(),
            display_name: profile.display_name.clone(),
            avatar_url: profile.avatar_url.clone(),
        }
    }
}
