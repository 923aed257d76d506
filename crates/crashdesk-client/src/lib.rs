//! CrashDesk client application
//!
//! End-user side of the helpdesk: registers users, scans crash-dump
//! locations, runs AI troubleshooting conversations and files tickets.
//! Every ticket write commits locally first, then a best-effort push
//! announces it to the support dashboard; inbound endpoints accept the
//! dashboard's status and knowledge-base sync.

pub mod config;
pub mod error;
pub mod intake;
pub mod routes;
pub mod store;
pub mod sync;

use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crashdesk_analyzer::{KnowledgeBase, ScanConfig, SignatureClassifier};
use crashdesk_assistant::Assistant;

pub use config::ClientConfig;
pub use store::ClientStore;
pub use sync::SupportGateway;

/// Shared state behind every handler
pub struct AppState {
    pub store: ClientStore,
    pub kb: KnowledgeBase,
    pub classifier: SignatureClassifier,
    pub assistant: Arc<dyn Assistant>,
    pub support: Arc<dyn SupportGateway>,
    pub scan: ScanConfig,
}

/// Build the client application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .nest("/api", routes::api_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
