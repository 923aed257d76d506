//! CrashDesk client application entry point

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crashdesk_analyzer::{KnowledgeBase, ScanConfig, SignatureClassifier};
use crashdesk_assistant::HttpAssistant;
use crashdesk_client::sync::HttpSupportGateway;
use crashdesk_client::{build_router, AppState, ClientConfig, ClientStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("CrashDesk client v{}", env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env();
    let kb = KnowledgeBase::open(&config.kb_path)?;
    if config.assistant_endpoint.is_none() {
        tracing::warn!("no assistant endpoint configured, chats will escalate to human support");
    }

    let state = Arc::new(AppState {
        store: ClientStore::new(),
        kb,
        classifier: SignatureClassifier::new(),
        assistant: Arc::new(HttpAssistant::new(
            config.assistant_endpoint.clone(),
            config.assistant_api_key.clone(),
            config.http_timeout,
        )),
        support: Arc::new(HttpSupportGateway::new(
            config.support_base_url.clone(),
            config.http_timeout,
        )),
        scan: ScanConfig {
            locations: config.dump_locations.clone(),
            max_dump_size: config.max_dump_size,
        },
    });

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!(bind = %config.bind, support = %config.support_base_url, "client app listening");
    axum::serve(listener, build_router(state)).await?;

    Ok(())
}
