//! Outbound sync to the client application
//!
//! Status changes and knowledge-base contributions are pushed best-effort:
//! the dashboard's own write has committed before either push runs, and a
//! failed push is logged and absorbed.

use async_trait::async_trait;
use std::time::Duration;

use crashdesk_core::sync::{KnowledgeUpdate, StatusUpdate};
use crashdesk_core::{DeskError, Result};

/// Outbound channel to the client application
#[async_trait]
pub trait ClientGateway: Send + Sync {
    async fn push_status(&self, ticket_id: &str, update: &StatusUpdate) -> Result<()>;

    async fn push_knowledge(&self, update: &KnowledgeUpdate) -> Result<()>;
}

/// HTTP gateway talking to the client application's sync endpoints
pub struct HttpClientGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpClientGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client, base_url: base_url.into() }
    }

    fn remote(url: &str, err: reqwest::Error) -> DeskError {
        DeskError::Remote { url: url.to_string(), reason: err.to_string() }
    }
}

#[async_trait]
impl ClientGateway for HttpClientGateway {
    async fn push_status(&self, ticket_id: &str, update: &StatusUpdate) -> Result<()> {
        let url = format!("{}/api/tickets/{ticket_id}/status", self.base_url);
        self.client
            .put(&url)
            .json(update)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Self::remote(&url, e))?;
        Ok(())
    }

    async fn push_knowledge(&self, update: &KnowledgeUpdate) -> Result<()> {
        let url = format!("{}/api/knowledge_base/update", self.base_url);
        self.client
            .post(&url)
            .json(update)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Self::remote(&url, e))?;
        Ok(())
    }
}

/// Test double that records every push instead of sending it
#[derive(Default)]
pub struct RecordingClientGateway {
    pub status_pushes: parking_lot::Mutex<Vec<(String, StatusUpdate)>>,
    pub knowledge_pushes: parking_lot::Mutex<Vec<KnowledgeUpdate>>,
}

#[async_trait]
impl ClientGateway for RecordingClientGateway {
    async fn push_status(&self, ticket_id: &str, update: &StatusUpdate) -> Result<()> {
        self.status_pushes.lock().push((ticket_id.to_string(), update.clone()));
        Ok(())
    }

    async fn push_knowledge(&self, update: &KnowledgeUpdate) -> Result<()> {
        self.knowledge_pushes.lock().push(update.clone());
        Ok(())
    }
}
