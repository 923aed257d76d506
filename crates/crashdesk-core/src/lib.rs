//! CrashDesk domain model
//!
//! Shared domain types for the two CrashDesk services: the client-facing
//! application (dump scanning, AI-assisted troubleshooting, ticket filing)
//! and the support dashboard (triage, assignment, resolution).
//!
//! This crate owns the pieces both sides must agree on:
//! - the ticket lifecycle (status/priority enums, reopen and resolution rules)
//! - round-robin agent selection
//! - the wire payloads exchanged during status sync
//! - the error taxonomy

pub mod api;
pub mod domain;
pub mod error;
pub mod roundrobin;
pub mod sync;

pub use domain::{
    Agent, AgentRole, Conversation, ConversationMessage, ConversationStatus, MessageRole, Priority,
    SenderType, SystemConfig, Ticket, TicketId, TicketMessage, TicketStatus, User,
};
pub use api::{ApiResponse, ErrorBody};
pub use error::{DeskError, Result};
