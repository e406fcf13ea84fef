//! Peer support chat rooms with a push-style message stream.
//!
//! Rooms keep a bounded history so polling clients can catch up with
//! `history(room, since)`, while [`MessageSubscription`] replays that backlog
//! and then follows live posts. Ending a room drops it from the hub, closes
//! every subscription, and keeps the participant's rating and feedback.

pub mod domain;
pub mod hub;
pub mod router;

pub use domain::{ChatError, ChatMessage, RoomId, RoomSummary, SessionFeedback};
pub use hub::{ChatHub, MessageSubscription};
pub use router::chat_router;
