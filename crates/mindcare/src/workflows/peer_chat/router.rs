use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ChatError, RoomId};
use super::hub::ChatHub;
use crate::workflows::wizard::SessionHandle;

#[derive(Debug, Clone, Deserialize)]
pub struct OpenRoomRequest {
    pub participants: Vec<SessionHandle>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostMessageRequest {
    pub sender: SessionHandle,
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndRoomRequest {
    pub participant: SessionHandle,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub since: Option<u64>,
}

/// Router builder for peer support rooms.
pub fn chat_router(hub: Arc<ChatHub>) -> Router {
    Router::new()
        .route("/api/v1/chat/rooms", post(open_room_handler).get(rooms_handler))
        .route(
            "/api/v1/chat/rooms/:room_id/messages",
            post(post_message_handler).get(history_handler),
        )
        .route("/api/v1/chat/rooms/:room_id/end", put(end_room_handler))
        .with_state(hub)
}

pub(crate) async fn open_room_handler(
    State(hub): State<Arc<ChatHub>>,
    axum::Json(request): axum::Json<OpenRoomRequest>,
) -> Response {
    match hub.open_room(request.participants) {
        Ok(room_id) => {
            (StatusCode::CREATED, axum::Json(json!({ "room_id": room_id }))).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn rooms_handler(State(hub): State<Arc<ChatHub>>) -> Response {
    (StatusCode::OK, axum::Json(hub.rooms())).into_response()
}

pub(crate) async fn post_message_handler(
    State(hub): State<Arc<ChatHub>>,
    Path(room_id): Path<String>,
    axum::Json(request): axum::Json<PostMessageRequest>,
) -> Response {
    match hub.post(&RoomId(room_id), &request.sender, &request.body) {
        Ok(message) => (StatusCode::CREATED, axum::Json(message)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn history_handler(
    State(hub): State<Arc<ChatHub>>,
    Path(room_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    match hub.history(&RoomId(room_id), query.since) {
        Ok(messages) => (StatusCode::OK, axum::Json(messages)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn end_room_handler(
    State(hub): State<Arc<ChatHub>>,
    Path(room_id): Path<String>,
    axum::Json(request): axum::Json<EndRoomRequest>,
) -> Response {
    match hub.end_room(
        &RoomId(room_id),
        &request.participant,
        request.rating,
        request.feedback.as_deref(),
    ) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: ChatError) -> Response {
    let status = match err {
        ChatError::UnknownRoom(_) => StatusCode::NOT_FOUND,
        ChatError::NotAParticipant { .. } => StatusCode::FORBIDDEN,
        ChatError::EmptyMessage | ChatError::NoParticipants | ChatError::InvalidRating(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
    };
    (status, axum::Json(json!({ "error": err.to_string() }))).into_response()
}
