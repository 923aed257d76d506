//! Ticket aggregate and its lifecycle rules

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{DeskError, Result};
use crate::Priority;

/// Prefix of every externally visible ticket identifier
pub const TICKET_ID_PREFIX: &str = "DUMP";

/// Externally visible ticket identifier: `DUMP-YYYYMMDD-XXXXXXXX`.
///
/// Generated once at creation and immutable thereafter. Collisions are
/// astronomically unlikely but callers still check the store and retry.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TicketId(String);

impl TicketId {
    pub fn generate(now: DateTime<Utc>) -> Self {
        let suffix: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(8)
            .collect::<String>()
            .to_uppercase();
        Self(format!("{}-{}-{}", TICKET_ID_PREFIX, now.format("%Y%m%d"), suffix))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let mut parts = raw.splitn(3, '-');
        let prefix = parts.next().unwrap_or_default();
        let date = parts.next().unwrap_or_default();
        let suffix = parts.next().unwrap_or_default();
        if prefix != TICKET_ID_PREFIX
            || date.len() != 8
            || !date.chars().all(|c| c.is_ascii_digit())
            || suffix.len() != 8
        {
            return Err(DeskError::validation("ticket_id", format!("malformed ticket id: {raw}")));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ticket lifecycle status
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Open,
    InProgress,
    PendingUser,
    Resolved,
    Closed,
}

impl TicketStatus {
    /// Whether the user may still post messages at this status.
    pub fn accepts_user_messages(self) -> bool {
        matches!(self, Self::Open | Self::InProgress | Self::PendingUser)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Open => "Open",
            Self::InProgress => "In Progress",
            Self::PendingUser => "Pending User Response",
            Self::Resolved => "Resolved",
            Self::Closed => "Closed",
        };
        write!(f, "{s}")
    }
}

/// A support ticket tracked through the fixed status lifecycle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ticket {
    /// Internal numeric key, owned by whichever store holds the row
    pub id: u64,
    pub ticket_id: TicketId,
    pub user_id: u64,
    pub title: String,
    pub description: String,
    pub error_code: Option<String>,
    pub priority: Priority,
    pub status: TicketStatus,
    pub assigned_to: Option<u64>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub solution: Option<String>,
    pub conversation_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Assign to an agent. Moves open tickets to in-progress; a more
    /// advanced status is never downgraded by assignment.
    pub fn assign(&mut self, agent_id: u64, now: DateTime<Utc>) {
        self.assigned_to = Some(agent_id);
        self.assigned_at = Some(now);
        if self.status == TicketStatus::Open {
            self.status = TicketStatus::InProgress;
        }
        self.touch(now);
    }

    /// Record that the user posted a message. A resolved ticket is reopened
    /// to in-progress rather than silently staying resolved.
    ///
    /// Returns `true` if the message reopened the ticket.
    pub fn record_user_message(&mut self, now: DateTime<Utc>) -> Result<bool> {
        if self.status == TicketStatus::Resolved {
            self.status = TicketStatus::InProgress;
            self.resolved_at = None;
            self.touch(now);
            return Ok(true);
        }
        if !self.status.accepts_user_messages() {
            return Err(DeskError::TicketLocked(self.ticket_id.to_string()));
        }
        self.touch(now);
        Ok(false)
    }

    /// Apply a staff status change. Resolution demands a non-empty solution
    /// and stamps `resolved_at`; the check happens before any mutation.
    pub fn set_status(
        &mut self,
        status: TicketStatus,
        solution: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if status == TicketStatus::Resolved {
            let text = solution
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or(DeskError::SolutionRequired)?;
            self.solution = Some(text.to_string());
            self.resolved_at = Some(now);
        } else {
            if let Some(text) = solution.filter(|s| !s.trim().is_empty()) {
                self.solution = Some(text);
            }
            if status != TicketStatus::Closed {
                // Moving off resolved reopens the ticket.
                self.resolved_at = None;
            }
        }
        self.status = status;
        self.touch(now);
        Ok(())
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}
