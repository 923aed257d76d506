//! Ticket endpoints: import/assignment, triage and inbound user sync

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crashdesk_core::sync::{StatusUpdate, TicketNotification, UserUpdate};
use crashdesk_core::{ApiResponse, Ticket, TicketStatus};

use crate::error::ApiResult;
use crate::store::{AssignmentOutcome, TicketFilter, TicketRecord};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tickets", post(receive_ticket).get(list_tickets))
        .route("/tickets/:ticket_id", get(get_ticket))
        .route("/tickets/:ticket_id/assign", post(assign))
        .route("/tickets/:ticket_id/status", put(update_status))
        .route("/tickets/:ticket_id/user_update", put(receive_user_update))
}

#[derive(Serialize)]
pub struct ImportOutcome {
    pub record: TicketRecord,
    pub assignment: AssignmentOutcome,
}

/// Receive a create notification from the client, import the ticket and
/// attempt round-robin assignment. Replays are safe: the existing record
/// and its current assignment come back unchanged.
pub async fn receive_ticket(
    State(state): State<Arc<AppState>>,
    Json(notification): Json<TicketNotification>,
) -> ApiResult<(StatusCode, Json<ApiResponse<ImportOutcome>>)> {
    let now = Utc::now();
    let (_, imported) = state.store.import_ticket(&notification)?;
    let assignment = state.store.assign_round_robin(&notification.ticket_id, now)?;
    let record = state.store.ticket(&notification.ticket_id)?;

    // Assignment moved the ticket to in-progress; let the client know.
    if matches!(assignment, AssignmentOutcome::Assigned { .. }) {
        push_status(&state, &record.ticket);
    }

    let status = if imported { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(ApiResponse::success(ImportOutcome { record, assignment }))))
}

pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<TicketFilter>,
) -> Json<ApiResponse<Vec<TicketRecord>>> {
    Json(ApiResponse::success(state.store.tickets(filter)))
}

pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<String>,
) -> ApiResult<Json<ApiResponse<TicketRecord>>> {
    Ok(Json(ApiResponse::success(state.store.ticket(&ticket_id)?)))
}

#[derive(Deserialize)]
pub struct AssignInput {
    pub requested_by: u64,
    #[serde(default)]
    pub target_agent_id: Option<u64>,
}

/// Manual assignment: managers assign anyone, agents self-claim unassigned
/// tickets. The losing side of a concurrent claim gets a 409 naming the
/// current assignee.
pub async fn assign(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<String>,
    Json(input): Json<AssignInput>,
) -> ApiResult<Json<ApiResponse<Ticket>>> {
    let ticket = state.store.manual_assign(
        &ticket_id,
        input.requested_by,
        input.target_agent_id,
        Utc::now(),
    )?;
    push_status(&state, &ticket);
    Ok(Json(ApiResponse::success(ticket)))
}

#[derive(Deserialize)]
pub struct StatusInput {
    pub status: TicketStatus,
    #[serde(default)]
    pub solution: Option<String>,
}

/// Staff status change. On success the new status is synced to the client,
/// and resolving a ticket that carries an error code additionally pushes
/// the solution into the client's knowledge base. Both pushes run after
/// the local commit and never roll it back.
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<String>,
    Json(input): Json<StatusInput>,
) -> ApiResult<Json<ApiResponse<Ticket>>> {
    let (ticket, sync, kb) =
        state.store.update_status(&ticket_id, input.status, input.solution, Utc::now())?;

    let client = state.client.clone();
    let id = ticket_id.clone();
    tokio::spawn(async move {
        if let Err(err) = client.push_status(&id, &sync).await {
            tracing::warn!(ticket_id = %id, %err, "status push failed");
        }
        if let Some(kb) = kb {
            if let Err(err) = client.push_knowledge(&kb).await {
                tracing::warn!(ticket_id = %id, %err, "knowledge base push failed");
            }
        }
    });

    Ok(Json(ApiResponse::success(ticket)))
}

#[derive(Serialize)]
pub struct SyncOutcome {
    pub applied: bool,
}

/// Inbound user-update sync from the client. Stale payloads report
/// `applied: false` and change nothing.
pub async fn receive_user_update(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<String>,
    Json(update): Json<UserUpdate>,
) -> ApiResult<Json<ApiResponse<SyncOutcome>>> {
    let applied = state.store.apply_user_update(&ticket_id, &update)?;
    Ok(Json(ApiResponse::success(SyncOutcome { applied })))
}

fn push_status(state: &Arc<AppState>, ticket: &Ticket) {
    let update = StatusUpdate {
        status: ticket.status,
        solution: ticket.solution.clone(),
        updated_at: ticket.updated_at,
    };
    let client = state.client.clone();
    let ticket_id = ticket.ticket_id.to_string();
    tokio::spawn(async move {
        if let Err(err) = client.push_status(&ticket_id, &update).await {
            tracing::warn!(%ticket_id, %err, "status push failed");
        }
    });
}
