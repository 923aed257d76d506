//! CrashDesk support dashboard
//!
//! Staff side of the helpdesk: imports tickets announced by the client
//! application, assigns them round-robin across available agents, tracks
//! triage through the status lifecycle and syncs every staff change back
//! to the client. Resolving a ticket that carries an error code also
//! contributes the solution to the client's knowledge base.

pub mod config;
pub mod error;
pub mod routes;
pub mod store;
pub mod sync;

use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::SupportConfig;
pub use store::SupportStore;
pub use sync::ClientGateway;

/// Shared state behind every handler
pub struct AppState {
    pub store: SupportStore,
    pub client: Arc<dyn ClientGateway>,
}

/// Build the support dashboard router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .nest("/api", routes::api_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
