//! HTTP routes of the support dashboard

pub mod agents;
pub mod health;
pub mod stats;
pub mod tickets;

use axum::Router;
use std::sync::Arc;

use crate::AppState;

/// Everything mounted under `/api`
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(tickets::router())
        .merge(agents::router())
        .merge(stats::router())
}
