//! Knowledge-base endpoints: lookup, inbound updates and feedback

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crashdesk_analyzer::{FeedbackKind, KbEntry};
use crashdesk_core::sync::KnowledgeUpdate;
use crashdesk_core::ApiResponse;

use crate::error::ApiResult;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/knowledge_base/update", post(receive_update))
        .route("/knowledge_base/:error_code", get(lookup))
        .route("/feedback", post(feedback))
}

pub async fn lookup(
    State(state): State<Arc<AppState>>,
    Path(error_code): Path<String>,
) -> Response {
    match state.kb.search(&error_code) {
        Some(entry) => Json(ApiResponse::success(entry)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<KbEntry>::error(
                "kb_entry_not_found",
                format!("no knowledge base entry for {error_code}"),
            )),
        )
            .into_response(),
    }
}

#[derive(Serialize)]
pub struct UpdateOutcome {
    pub error_code: String,
}

/// Inbound push from the support dashboard when a ticket with an error
/// code is resolved.
pub async fn receive_update(
    State(state): State<Arc<AppState>>,
    Json(update): Json<KnowledgeUpdate>,
) -> ApiResult<Json<ApiResponse<UpdateOutcome>>> {
    state.kb.record_resolution(&update.error_code, &update.solution, &update.source)?;
    Ok(Json(ApiResponse::success(UpdateOutcome { error_code: update.error_code })))
}

#[derive(Deserialize)]
pub struct FeedbackInput {
    pub error_code: String,
    pub feedback: FeedbackKind,
}

#[derive(Serialize)]
pub struct FeedbackOutcome {
    pub known: bool,
}

pub async fn feedback(
    State(state): State<Arc<AppState>>,
    Json(input): Json<FeedbackInput>,
) -> ApiResult<Json<ApiResponse<FeedbackOutcome>>> {
    let known = state.kb.record_feedback(&input.error_code, input.feedback)?;
    Ok(Json(ApiResponse::success(FeedbackOutcome { known })))
}
