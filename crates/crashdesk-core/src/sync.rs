//! Status-sync wire payloads and apply rules
//!
//! Both directions are best-effort pushes: the sender logs failures and
//! never rolls back the local write that triggered them. The receiver
//! applies last-write-wins on `updated_at`, so replaying the same payload
//! (or delivering a stale one) is a no-op and any side effects tied to an
//! accepted apply fire at most once per payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Priority, SystemConfig, Ticket, TicketStatus};

/// Client -> Support: full ticket payload pushed after creation. The support
/// side owns its own store, so this carries everything needed to import the
/// ticket, not just its id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TicketNotification {
    pub ticket_id: String,
    pub user_id: u64,
    pub username: String,
    pub email: String,
    pub title: String,
    pub description: String,
    pub error_code: Option<String>,
    pub priority: Priority,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub system_config: Option<SystemConfig>,
}

/// Client -> Support: the user touched the ticket (new message, possible
/// reopen).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserUpdate {
    pub status: TicketStatus,
    pub updated_at: DateTime<Utc>,
}

/// Support -> Client: staff changed status and/or recorded a solution.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: TicketStatus,
    pub solution: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Support -> Client: feed a resolved ticket's fix back into the knowledge
/// base.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KnowledgeUpdate {
    pub error_code: String,
    pub solution: String,
    pub source: String,
}

/// Apply a remote status update to a local ticket copy. Returns `true` if
/// the payload was newer than the local row and was applied.
pub fn apply_status_update(ticket: &mut Ticket, update: &StatusUpdate) -> bool {
    if update.updated_at <= ticket.updated_at {
        tracing::debug!(
            ticket_id = %ticket.ticket_id,
            incoming = %update.updated_at,
            local = %ticket.updated_at,
            "dropping stale status-sync payload"
        );
        return false;
    }
    ticket.status = update.status;
    if let Some(solution) = update.solution.as_deref().filter(|s| !s.trim().is_empty()) {
        ticket.solution = Some(solution.to_string());
    }
    if update.status == TicketStatus::Resolved {
        if ticket.resolved_at.is_none() {
            ticket.resolved_at = Some(update.updated_at);
        }
    } else if update.status != TicketStatus::Closed {
        // Moving off resolved is a reopen; mirror the local reopen path.
        ticket.resolved_at = None;
    }
    ticket.updated_at = update.updated_at;
    true
}

/// Apply a user-update payload on the support side. Same last-write-wins
/// contract as [`apply_status_update`].
pub fn apply_user_update(ticket: &mut Ticket, update: &UserUpdate) -> bool {
    if update.updated_at <= ticket.updated_at {
        tracing::debug!(
            ticket_id = %ticket.ticket_id,
            incoming = %update.updated_at,
            local = %ticket.updated_at,
            "dropping stale user-update payload"
        );
        return false;
    }
    ticket.status = update.status;
    if update.status != TicketStatus::Resolved && update.status != TicketStatus::Closed {
        // Same reopen rule as the local user-message path.
        ticket.resolved_at = None;
    }
    ticket.updated_at = update.updated_at;
    true
}
