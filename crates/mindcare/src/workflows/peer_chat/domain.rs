use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::wizard::SessionHandle;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Message delivered to a room. `sequence` increases by one per room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub room_id: RoomId,
    pub sequence: u64,
    pub sender_id: String,
    pub sender_name: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub participants: Vec<SessionHandle>,
    pub message_count: u64,
}

/// Closing record left behind when a participant ends a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionFeedback {
    pub room_id: RoomId,
    pub ended_by: SessionHandle,
    pub rating: Option<u8>,
    pub feedback: Option<String>,
    pub message_count: u64,
    pub ended_at: DateTime<Utc>,
}

impl SessionFeedback {
    pub const MAX_RATING: u8 = 5;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    #[error("chat room '{0}' does not exist")]
    UnknownRoom(RoomId),
    #[error("message body is empty")]
    EmptyMessage,
    #[error("'{user_id}' is not a participant in this room")]
    NotAParticipant { user_id: String },
    #[error("a chat room needs at least one participant")]
    NoParticipants,
    #[error("rating {0} is outside 1..=5")]
    InvalidRating(u8),
}
