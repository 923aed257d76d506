//! Health check endpoint

use axum::extract::State;
use axum::{response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub assistant_configured: bool,
    pub kb_entries: usize,
    pub timestamp: String,
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        assistant_configured: state.assistant.is_configured(),
        kb_entries: state.kb.entries().len(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
