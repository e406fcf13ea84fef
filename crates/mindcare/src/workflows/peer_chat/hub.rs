use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use super::domain::{ChatError, ChatMessage, RoomId, RoomSummary, SessionFeedback};
use crate::config::ChatConfig;
use crate::workflows::wizard::{Clock, SessionHandle};

static ROOM_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_room_id() -> RoomId {
    let id = ROOM_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RoomId(format!("room-{id:06}"))
}

struct Room {
    participants: Vec<SessionHandle>,
    history: VecDeque<ChatMessage>,
    next_sequence: u64,
    sender: broadcast::Sender<ChatMessage>,
}

impl Room {
    fn admits(&self, user_id: &str) -> bool {
        self.participants
            .iter()
            .any(|participant| participant.user_id == user_id)
    }

    fn since(&self, since: Option<u64>) -> impl Iterator<Item = &ChatMessage> {
        let floor = since.unwrap_or(0);
        self.history
            .iter()
            .filter(move |message| message.sequence > floor)
    }
}

/// In-process message stream for peer support rooms.
pub struct ChatHub {
    rooms: Mutex<HashMap<RoomId, Room>>,
    ended: Mutex<Vec<SessionFeedback>>,
    config: ChatConfig,
    clock: Arc<dyn Clock>,
}

impl ChatHub {
    pub fn new(config: ChatConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            ended: Mutex::new(Vec::new()),
            config,
            clock,
        }
    }

    pub fn open_room(&self, participants: Vec<SessionHandle>) -> Result<RoomId, ChatError> {
        if participants.is_empty() {
            return Err(ChatError::NoParticipants);
        }

        let room_id = next_room_id();
        let (sender, _) = broadcast::channel(self.config.channel_capacity.max(1));
        debug!(%room_id, participants = participants.len(), "chat room opened");

        self.lock().insert(
            room_id.clone(),
            Room {
                participants,
                history: VecDeque::new(),
                next_sequence: 1,
                sender,
            },
        );
        Ok(room_id)
    }

    /// Appends a trimmed message to the room and fans it out to live subscribers.
    pub fn post(
        &self,
        room_id: &RoomId,
        sender: &SessionHandle,
        body: &str,
    ) -> Result<ChatMessage, ChatError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let mut rooms = self.lock();
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| ChatError::UnknownRoom(room_id.clone()))?;
        if !room.admits(&sender.user_id) {
            return Err(ChatError::NotAParticipant {
                user_id: sender.user_id.clone(),
            });
        }

        let message = ChatMessage {
            room_id: room_id.clone(),
            sequence: room.next_sequence,
            sender_id: sender.user_id.clone(),
            sender_name: sender.display_name.clone(),
            body: body.to_string(),
            sent_at: self.clock.now(),
        };
        room.next_sequence += 1;
        room.history.push_back(message.clone());
        while room.history.len() > self.config.history_limit {
            room.history.pop_front();
        }

        // No live subscribers is fine; history still holds the message.
        let _ = room.sender.send(message.clone());
        Ok(message)
    }

    /// Messages after `since`, oldest first. Serves clients that still poll.
    pub fn history(&self, room_id: &RoomId, since: Option<u64>) -> Result<Vec<ChatMessage>, ChatError> {
        let rooms = self.lock();
        let room = rooms
            .get(room_id)
            .ok_or_else(|| ChatError::UnknownRoom(room_id.clone()))?;
        Ok(room.since(since).cloned().collect())
    }

    /// Backlog after `since` followed by live messages.
    pub fn subscribe(
        &self,
        room_id: &RoomId,
        since: Option<u64>,
    ) -> Result<MessageSubscription, ChatError> {
        let rooms = self.lock();
        let room = rooms
            .get(room_id)
            .ok_or_else(|| ChatError::UnknownRoom(room_id.clone()))?;

        let backlog: VecDeque<ChatMessage> = room.since(since).cloned().collect();
        let last_seen = backlog
            .back()
            .map(|message| message.sequence)
            .unwrap_or_else(|| since.unwrap_or(0));

        Ok(MessageSubscription {
            room_id: room_id.clone(),
            backlog,
            receiver: room.sender.subscribe(),
            last_seen,
        })
    }

    /// Closes the room for everyone and records the participant's rating and feedback.
    /// Subscribers drain what was already delivered and then see the stream end.
    pub fn end_room(
        &self,
        room_id: &RoomId,
        participant: &SessionHandle,
        rating: Option<u8>,
        feedback: Option<&str>,
    ) -> Result<SessionFeedback, ChatError> {
        if let Some(rating) = rating {
            if !(1..=SessionFeedback::MAX_RATING).contains(&rating) {
                return Err(ChatError::InvalidRating(rating));
            }
        }

        let room = {
            let mut rooms = self.lock();
            let room = rooms
                .get(room_id)
                .ok_or_else(|| ChatError::UnknownRoom(room_id.clone()))?;
            if !room.admits(&participant.user_id) {
                return Err(ChatError::NotAParticipant {
                    user_id: participant.user_id.clone(),
                });
            }
            rooms.remove(room_id)
        };

        let record = SessionFeedback {
            room_id: room_id.clone(),
            ended_by: participant.clone(),
            rating,
            feedback: feedback
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string),
            message_count: room.map_or(0, |room| room.next_sequence - 1),
            ended_at: self.clock.now(),
        };
        info!(%room_id, rating = ?record.rating, messages = record.message_count, "chat room ended");

        self.ended
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(record)
    }

    /// Closing records of every ended room, oldest first.
    pub fn ended_sessions(&self) -> Vec<SessionFeedback> {
        self.ended
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn rooms(&self) -> Vec<RoomSummary> {
        let rooms = self.lock();
        let mut summaries: Vec<RoomSummary> = rooms
            .iter()
            .map(|(room_id, room)| RoomSummary {
                room_id: room_id.clone(),
                participants: room.participants.clone(),
                message_count: room.next_sequence - 1,
            })
            .collect();
        summaries.sort_by(|a, b| a.room_id.0.cmp(&b.room_id.0));
        summaries
    }

    pub fn subscriber_count(&self, room_id: &RoomId) -> Result<usize, ChatError> {
        let rooms = self.lock();
        rooms
            .get(room_id)
            .map(|room| room.sender.receiver_count())
            .ok_or_else(|| ChatError::UnknownRoom(room_id.clone()))
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RoomId, Room>> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Live view of one room. Dropping it unsubscribes.
pub struct MessageSubscription {
    room_id: RoomId,
    backlog: VecDeque<ChatMessage>,
    receiver: broadcast::Receiver<ChatMessage>,
    last_seen: u64,
}

impl MessageSubscription {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Next message in sequence order, or `None` once the room is gone.
    pub async fn next(&mut self) -> Option<ChatMessage> {
        if let Some(message) = self.backlog.pop_front() {
            return Some(message);
        }

        loop {
            match self.receiver.recv().await {
                Ok(message) if message.sequence <= self.last_seen => continue,
                Ok(message) => {
                    self.last_seen = message.sequence;
                    return Some(message);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(room_id = %self.room_id, skipped, "chat subscriber lagged; skipping ahead");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl std::fmt::Debug for MessageSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageSubscription")
            .field("room_id", &self.room_id)
            .field("backlog", &self.backlog.len())
            .field("last_seen", &self.last_seen)
            .finish()
    }
}
