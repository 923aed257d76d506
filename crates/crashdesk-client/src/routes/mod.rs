//! HTTP routes of the client application

pub mod chat;
pub mod health;
pub mod knowledge;
pub mod scan;
pub mod tickets;
pub mod users;

use axum::Router;
use std::sync::Arc;

use crate::AppState;

/// Everything mounted under `/api`
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(users::router())
        .merge(tickets::router())
        .merge(chat::router())
        .merge(knowledge::router())
        .merge(scan::router())
}
