//! CrashDesk support dashboard entry point

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crashdesk_core::AgentRole;
use crashdesk_support::sync::HttpClientGateway;
use crashdesk_support::{build_router, AppState, SupportConfig, SupportStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("CrashDesk support dashboard v{}", env!("CARGO_PKG_VERSION"));

    let config = SupportConfig::from_env();
    let store = SupportStore::new();

    // Default staff roster; real deployments add agents over the API.
    store.add_agent("Support Manager", "manager@crashdesk.test", AgentRole::Manager);
    store.add_agent("Agent One", "agent1@crashdesk.test", AgentRole::Agent);
    store.add_agent("Agent Two", "agent2@crashdesk.test", AgentRole::Agent);

    let state = Arc::new(AppState {
        store,
        client: Arc::new(HttpClientGateway::new(
            config.client_base_url.clone(),
            config.http_timeout,
        )),
    });

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!(bind = %config.bind, client = %config.client_base_url, "support dashboard listening");
    axum::serve(listener, build_router(state)).await?;

    Ok(())
}
