//! Ticket endpoints: filing, listing, messaging and inbound status sync

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crashdesk_core::sync::{StatusUpdate, UserUpdate};
use crashdesk_core::{ApiResponse, Ticket, TicketMessage, TicketStatus};

use crate::error::ApiResult;
use crate::store::TicketDraft;
use crate::{intake, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tickets", post(create_ticket).get(list_tickets))
        .route("/tickets/:ticket_id", get(get_ticket))
        .route("/tickets/:ticket_id/messages", post(add_message))
        .route("/tickets/:ticket_id/status", put(receive_status_update))
}

/// File a ticket. The local write commits first; the push to the support
/// dashboard runs detached and a failure there never unwinds the ticket.
pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<TicketDraft>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Ticket>>)> {
    intake::validate(&draft)?;
    let (ticket, user) = state.store.file_ticket(draft, Utc::now())?;

    let notification = intake::notification(&ticket, &user);
    let support = state.support.clone();
    tokio::spawn(async move {
        if let Err(err) = support.notify_ticket(&notification).await {
            tracing::warn!(
                ticket_id = %notification.ticket_id,
                %err,
                "support notification failed, ticket stands locally"
            );
        }
    });

    Ok((StatusCode::CREATED, Json(ApiResponse::success(ticket))))
}

#[derive(Deserialize)]
pub struct ListParams {
    pub user_id: u64,
    #[serde(default)]
    pub status: Option<TicketStatus>,
}

pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ApiResponse<Vec<Ticket>>>> {
    state.store.user(params.user_id)?;
    let tickets = state.store.tickets_for_user(params.user_id, params.status);
    Ok(Json(ApiResponse::success(tickets)))
}

#[derive(Serialize)]
pub struct TicketDetail {
    pub ticket: Ticket,
    pub messages: Vec<TicketMessage>,
}

pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<String>,
) -> ApiResult<Json<ApiResponse<TicketDetail>>> {
    let ticket = state.store.ticket(&ticket_id)?;
    let messages = state.store.visible_messages(&ticket_id)?;
    Ok(Json(ApiResponse::success(TicketDetail { ticket, messages })))
}

#[derive(Deserialize)]
pub struct NewMessage {
    pub user_id: u64,
    pub body: String,
}

#[derive(Serialize)]
pub struct MessagePosted {
    pub message: TicketMessage,
    pub reopened: bool,
}

pub async fn add_message(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<String>,
    Json(input): Json<NewMessage>,
) -> ApiResult<(StatusCode, Json<ApiResponse<MessagePosted>>)> {
    let now = Utc::now();
    let (ticket, message, reopened) =
        state.store.add_user_message(&ticket_id, input.user_id, input.body, now)?;

    let update = UserUpdate { status: ticket.status, updated_at: ticket.updated_at };
    let support = state.support.clone();
    tokio::spawn(async move {
        if let Err(err) = support.push_user_update(&ticket_id, &update).await {
            tracing::warn!(%ticket_id, %err, "user-update push failed");
        }
    });

    Ok((StatusCode::CREATED, Json(ApiResponse::success(MessagePosted { message, reopened }))))
}

#[derive(Serialize)]
pub struct SyncOutcome {
    pub applied: bool,
}

/// Inbound status sync from the support dashboard. Stale payloads report
/// `applied: false` and change nothing.
pub async fn receive_status_update(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> ApiResult<Json<ApiResponse<SyncOutcome>>> {
    let applied = state.store.apply_status_update(&ticket_id, &update)?;
    Ok(Json(ApiResponse::success(SyncOutcome { applied })))
}
