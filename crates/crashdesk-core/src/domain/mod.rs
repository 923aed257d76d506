//! Core entities shared by the client and support applications

mod ticket;

pub use ticket::{Ticket, TicketId, TicketStatus};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ticket priority as picked by the requester
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        };
        write!(f, "{s}")
    }
}

/// Support staff role
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    #[default]
    Agent,
    Manager,
}

/// Support staff member
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Agent {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub role: AgentRole,
    pub is_available: bool,
    /// Round-robin fairness is defined purely by this field: the available
    /// agent with the oldest (or no) assignment is next in line.
    pub last_assigned: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Agent {
    pub fn new(id: u64, name: impl Into<String>, email: impl Into<String>, role: AgentRole) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            role,
            is_available: true,
            last_assigned: None,
            created_at: Utc::now(),
        }
    }

    pub fn can_take_ticket(&self) -> bool {
        self.role == AgentRole::Agent && self.is_available
    }
}

/// Who authored a ticket message
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    User,
    Support,
    System,
}

/// A message on a ticket. Append-only: never mutated or deleted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TicketMessage {
    pub id: u64,
    /// Internal key of the owning ticket
    pub ticket_key: u64,
    pub sender_id: Option<u64>,
    pub sender_type: SenderType,
    pub body: String,
    /// Staff-only notes are hidden from the end user
    pub is_internal: bool,
    pub created_at: DateTime<Utc>,
}

/// Conversation lifecycle with the AI assistant
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    #[default]
    InProgress,
    Escalated,
}

/// An AI troubleshooting conversation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Conversation {
    pub id: u64,
    pub conversation_id: String,
    pub user_id: u64,
    pub error_code: Option<String>,
    pub status: ConversationStatus,
    pub escalated: bool,
    pub escalation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Mark the conversation as needing human follow-up.
    pub fn escalate(&mut self, reason: impl Into<String>, now: DateTime<Utc>) {
        self.status = ConversationStatus::Escalated;
        self.escalated = true;
        self.escalation_reason = Some(reason.into());
        self.updated_at = now;
    }
}

/// Speaker in an AI conversation
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A single turn in an AI conversation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: u64,
    pub conversation_key: u64,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Hardware/OS details collected at registration, surfaced to support staff
/// in the initial system message of every ticket.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SystemConfig {
    pub os_version: String,
    pub processor: String,
    pub ram_size: String,
    pub storage_type: String,
    #[serde(default)]
    pub graphics_card: Option<String>,
    #[serde(default)]
    pub motherboard: Option<String>,
    #[serde(default)]
    pub additional_info: Option<String>,
}

impl SystemConfig {
    /// Render the block appended to a new ticket's system message.
    pub fn summary(&self) -> String {
        let mut out = String::from("System Configuration:\n");
        out.push_str(&format!("OS: {}\n", self.os_version));
        out.push_str(&format!("Processor: {}\n", self.processor));
        out.push_str(&format!("RAM: {}\n", self.ram_size));
        out.push_str(&format!("Storage: {}\n", self.storage_type));
        if let Some(gpu) = self.graphics_card.as_deref().filter(|g| !g.is_empty()) {
            out.push_str(&format!("Graphics: {gpu}\n"));
        }
        if let Some(extra) = self.additional_info.as_deref().filter(|i| !i.is_empty()) {
            out.push_str(&format!("Additional Info: {extra}\n"));
        }
        out
    }
}

/// End user of the client application
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub system_config: Option<SystemConfig>,
    pub created_at: DateTime<Utc>,
}
