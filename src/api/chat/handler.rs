use axum::{extract::{Path, State}, http::StatusCode, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::api::middleware::AuthUser;
use crate::config::state::AppState;
use crate::database::{Message, User};
use crate::utils::{sanitizer::sanitize_input, AppError, HandlerResponse};

pub const MAX_MESSAGE_CHARS: usize = 2000;

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub recipient: String,
    pub content: String,
}

fn find_user(state: &AppState, username: &str) -> Result<User, AppError> {
    state
        .users
        .find_by_username(username.trim())
        .ok_or_else(|| AppError::NotFound(format!("User '{}' not found", username.trim())))
}

/// Sends a message to another registered user
#[instrument(name = "send_message", skip(state, caller, payload), fields(sender = %caller.username))]
pub async fn send_message(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(payload): Json<SendMessageRequest>,
) -> Result<HandlerResponse, AppError> {
    // Length is measured before escaping
    if payload.content.trim().chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::BadRequest(format!(
            "Message content cannot exceed {MAX_MESSAGE_CHARS} characters"
        )));
    }

    let content: String = sanitize_input(&payload.content);
    if content.is_empty() {
        return Err(AppError::BadRequest("Message content cannot be empty".into()));
    }

    let recipient: User = find_user(&state, &payload.recipient)?;

    let message: Message = Message {
        id: Uuid::new_v4(),
        sender_id: caller.user_id,
        sender: caller.username.clone(),
        recipient_id: recipient.id,
        recipient: recipient.username,
        content,
        sent_at: Utc::now(),
    };
    state.messages.push(message.clone());

    info!("Message {} delivered to {}", message.id, message.recipient);

    Ok(HandlerResponse::new(StatusCode::CREATED)
        .message("Message sent")
        .data(json!(message)))
}

/// Every message the caller sent or received
pub async fn list_messages(
    State(state): State<AppState>,
    caller: AuthUser,
) -> HandlerResponse {
    let messages: Vec<Message> = state.messages.for_user(&caller.user_id);

    HandlerResponse::new(StatusCode::OK)
        .data(json!({ "messages": messages, "count": messages.len() }))
}

/// Messages exchanged with one other user
pub async fn conversation(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(username): Path<String>,
) -> Result<HandlerResponse, AppError> {
    let peer: User = find_user(&state, &username)?;
    let messages: Vec<Message> = state.messages.conversation(&caller.user_id, &peer.id);

    Ok(HandlerResponse::new(StatusCode::OK)
        .data(json!({ "with": peer.username, "messages": messages, "count": messages.len() })))
}
