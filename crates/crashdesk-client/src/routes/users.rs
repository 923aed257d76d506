//! User registration endpoints

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;

use crashdesk_core::{ApiResponse, SystemConfig, User};

use crate::error::ApiResult;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/:id", get(get_user))
}

#[derive(Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub system_config: Option<SystemConfig>,
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateUser>,
) -> ApiResult<(StatusCode, Json<ApiResponse<User>>)> {
    let user = state.store.create_user(input.username, input.email, input.system_config)?;
    tracing::info!(user_id = user.id, "user registered");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<Json<ApiResponse<User>>> {
    Ok(Json(ApiResponse::success(state.store.user(id)?)))
}
