//! Outbound sync to the support dashboard
//!
//! Both pushes are best-effort: the local write has already committed when
//! they run, and a failure is logged and absorbed rather than rolled back.

use async_trait::async_trait;
use std::time::Duration;

use crashdesk_core::sync::{TicketNotification, UserUpdate};
use crashdesk_core::{DeskError, Result};

/// Outbound channel to the support dashboard
#[async_trait]
pub trait SupportGateway: Send + Sync {
    /// Announce a freshly filed ticket (full payload, support imports it).
    async fn notify_ticket(&self, notification: &TicketNotification) -> Result<()>;

    /// Tell support the user touched a ticket (new message, possible reopen).
    async fn push_user_update(&self, ticket_id: &str, update: &UserUpdate) -> Result<()>;
}

/// HTTP gateway talking to the support dashboard's sync endpoints
pub struct HttpSupportGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSupportGateway {
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
impl SupportGateway for HttpSupportGateway {
    async fn notify_ticket(&self, notification: &TicketNotification) -> Result<()> {
        let url = format!("{}/api/tickets", self.base_url);
        self.client
            .post(&url)
            .json(notification)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Self::remote(&url, e))?;
        Ok(())
    }

    async fn push_user_update(&self, ticket_id: &str, update: &UserUpdate) -> Result<()> {
        let url = format!("{}/api/tickets/{ticket_id}/user_update", self.base_url);
        self.client
            .put(&url)
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
pub struct RecordingGateway {
    pub notifications: parking_lot::Mutex<Vec<TicketNotification>>,
    pub user_updates: parking_lot::Mutex<Vec<(String, UserUpdate)>>,
}

#[async_trait]
impl SupportGateway for RecordingGateway {
    async fn notify_ticket(&self, notification: &TicketNotification) -> Result<()> {
        self.notifications.lock().push(notification.clone());
        Ok(())
    }

    async fn push_user_update(&self, ticket_id: &str, update: &UserUpdate) -> Result<()> {
        self.user_updates.lock().push((ticket_id.to_string(), update.clone()));
        Ok(())
    }
}

/// Gateway that always fails, for exercising the best-effort contract
pub struct FailingGateway;

#[async_trait]
impl SupportGateway for FailingGateway {
    async fn notify_ticket(&self, _: &TicketNotification) -> Result<()> {
        Err(DeskError::Remote { url: "http://support.invalid".into(), reason: "down".into() })
    }

    async fn push_user_update(&self, _: &str, _: &UserUpdate) -> Result<()> {
        Err(DeskError::Remote { url: "http://support.invalid".into(), reason: "down".into() })
    }
}
