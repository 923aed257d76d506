//! Agent management endpoints

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;

use crashdesk_core::{Agent, AgentRole, ApiResponse};

use crate::error::ApiResult;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/agents", get(list_agents).post(create_agent))
        .route("/agents/:id/availability", put(set_availability))
}

pub async fn list_agents(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<Vec<Agent>>> {
    Json(ApiResponse::success(state.store.agents()))
}

#[derive(Deserialize)]
pub struct CreateAgent {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: AgentRole,
}

pub async fn create_agent(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateAgent>,
) -> (StatusCode, Json<ApiResponse<Agent>>) {
    let agent = state.store.add_agent(input.name, input.email, input.role);
    tracing::info!(agent_id = agent.id, role = ?agent.role, "agent created");
    (StatusCode::CREATED, Json(ApiResponse::success(agent)))
}

#[derive(Deserialize)]
pub struct Availability {
    pub is_available: bool,
}

pub async fn set_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(input): Json<Availability>,
) -> ApiResult<Json<ApiResponse<Agent>>> {
    let agent = state.store.set_agent_availability(id, input.is_available)?;
    Ok(Json(ApiResponse::success(agent)))
}
