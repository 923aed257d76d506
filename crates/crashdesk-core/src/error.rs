//! Error types for CrashDesk

use thiserror::Error;

/// CrashDesk error type
#[derive(Error, Debug)]
pub enum DeskError {
    /// A field failed validation; nothing was persisted
    #[error("validation failed on {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// Ticket not known on this side; signals a cross-service consistency gap
    #[error("ticket not found: {0}")]
    TicketNotFound(String),

    /// Agent not found
    #[error("agent not found: {0}")]
    AgentNotFound(u64),

    /// User not found
    #[error("user not found: {0}")]
    UserNotFound(u64),

    /// Conversation not found
    #[error("conversation not found: {0}")]
    ConversationNotFound(String),

    /// Losing side of a concurrent claim on an unassigned ticket
    #[error("ticket {ticket_id} already assigned to agent {agent_id}")]
    AlreadyAssigned { ticket_id: String, agent_id: u64 },

    /// Resolution attempted without solution text
    #[error("a non-empty solution is required to resolve a ticket")]
    SolutionRequired,

    /// Ticket status no longer accepts user messages
    #[error("ticket {0} no longer accepts user messages")]
    TicketLocked(String),

    /// Actor lacks permission for the attempted operation
    #[error("actor {0} is not permitted to perform this operation")]
    NotPermitted(u64),

    /// Remote call failed; the local write that triggered it stands
    #[error("remote call to {url} failed: {reason}")]
    Remote { url: String, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DeskError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation { field, reason: reason.into() }
    }
}

/// Result type for CrashDesk
pub type Result<T> = std::result::Result<T, DeskError>;
