//! Dashboard aggregate endpoint

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

use crashdesk_core::ApiResponse;

use crate::store::Stats;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/stats", get(stats))
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Json<ApiResponse<Stats>> {
    Json(ApiResponse::success(state.store.stats()))
}
