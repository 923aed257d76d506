//! AI conversation endpoints

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crashdesk_assistant::Turn;
use crashdesk_core::{
    ApiResponse, Conversation, ConversationMessage, ConversationStatus, DeskError,
};

use crate::error::ApiResult;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/conversations", post(create_conversation))
        .route("/conversations/:conversation_id", get(get_conversation))
        .route("/chat", post(chat))
}

#[derive(Deserialize)]
pub struct NewConversation {
    pub user_id: u64,
    #[serde(default)]
    pub error_code: Option<String>,
}

pub async fn create_conversation(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewConversation>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Conversation>>)> {
    let conversation = state.store.create_conversation(input.user_id, input.error_code)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(conversation))))
}

#[derive(Serialize)]
pub struct ConversationDetail {
    pub conversation: Conversation,
    pub messages: Vec<ConversationMessage>,
}

pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
) -> ApiResult<Json<ApiResponse<ConversationDetail>>> {
    let conversation = state.store.conversation(&conversation_id)?;
    let messages = state.store.conversation_history(&conversation_id)?;
    Ok(Json(ApiResponse::success(ConversationDetail { conversation, messages })))
}

#[derive(Deserialize)]
pub struct ChatInput {
    pub conversation_id: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ChatReply {
    pub reply: String,
    pub escalated: bool,
    pub escalation_reason: Option<String>,
    pub conversation_status: ConversationStatus,
}

/// One chat exchange. The assistant never fails outright: transport
/// problems come back as an escalating fallback reply, so this endpoint
/// only errors on bad input or an unknown conversation.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(input): Json<ChatInput>,
) -> ApiResult<Json<ApiResponse<ChatReply>>> {
    if input.message.trim().is_empty() {
        return Err(DeskError::validation("message", "must not be empty").into());
    }
    let conversation = state.store.conversation(&input.conversation_id)?;

    let history: Vec<Turn> = state
        .store
        .conversation_history(&input.conversation_id)?
        .into_iter()
        .map(|m| Turn { role: m.role, content: m.content })
        .collect();

    let reply = state
        .assistant
        .reply(&input.message, conversation.error_code.as_deref(), &history)
        .await;

    let conversation =
        state.store.record_chat(&input.conversation_id, &input.message, &reply, Utc::now())?;
    if conversation.status == ConversationStatus::Escalated {
        tracing::info!(
            conversation_id = %conversation.conversation_id,
            reason = conversation.escalation_reason.as_deref().unwrap_or("unspecified"),
            "conversation escalated to human support"
        );
    }

    Ok(Json(ApiResponse::success(ChatReply {
        reply: reply.content,
        escalated: conversation.escalated,
        escalation_reason: conversation.escalation_reason,
        conversation_status: conversation.status,
    })))
}
