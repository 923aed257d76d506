//! In-memory client-side store
//!
//! The client application owns its records outright; the support dashboard
//! keeps an independent copy fed by status sync. Everything lives behind a
//! single `RwLock` so multi-step operations (id generation plus insert,
//! message append plus reopen) commit atomically.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crashdesk_analyzer::{DumpFile, Verdict};
use crashdesk_assistant::AssistantReply;
use crashdesk_core::sync::StatusUpdate;
use crashdesk_core::{
    Conversation, ConversationMessage, ConversationStatus, DeskError, MessageRole, Priority,
    Result, SenderType, SystemConfig, Ticket, TicketId, TicketMessage, TicketStatus, User,
};

/// Stored outcome of analyzing one dump file
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DumpAnalysis {
    pub id: u64,
    pub user_id: u64,
    pub path: PathBuf,
    pub filename: String,
    pub size: u64,
    pub verdict: Verdict,
    pub analyzed_at: DateTime<Utc>,
}

/// A validated ticket draft ready for filing
#[derive(Clone, Debug, Deserialize)]
pub struct TicketDraft {
    pub user_id: u64,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub steps_tried: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Default)]
struct State {
    users: HashMap<u64, User>,
    /// Keyed by the external ticket id
    tickets: HashMap<String, Ticket>,
    /// Ticket internal key -> append-only message log
    messages: HashMap<u64, Vec<TicketMessage>>,
    conversations: HashMap<String, Conversation>,
    conversation_messages: HashMap<u64, Vec<ConversationMessage>>,
    analyses: Vec<DumpAnalysis>,
    next_user_id: u64,
    next_ticket_key: u64,
    next_message_id: u64,
    next_conversation_key: u64,
    next_turn_id: u64,
    next_analysis_id: u64,
}

/// Client application store
#[derive(Default)]
pub struct ClientStore {
    state: RwLock<State>,
}

impl ClientStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_user(
        &self,
        username: String,
        email: String,
        system_config: Option<SystemConfig>,
    ) -> Result<User> {
        if username.trim().is_empty() {
            return Err(DeskError::validation("username", "must not be empty"));
        }
        if !email.contains('@') {
            return Err(DeskError::validation("email", "must be an email address"));
        }
        let mut state = self.state.write();
        state.next_user_id += 1;
        let user = User {
            id: state.next_user_id,
            username,
            email,
            system_config,
            created_at: Utc::now(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    pub fn user(&self, id: u64) -> Result<User> {
        self.state.read().users.get(&id).cloned().ok_or(DeskError::UserNotFound(id))
    }

    /// File a validated draft: generate a collision-checked ticket id and
    /// commit the ticket together with its initial system message.
    pub fn file_ticket(&self, draft: TicketDraft, now: DateTime<Utc>) -> Result<(Ticket, User)> {
        let mut state = self.state.write();
        let user = state
            .users
            .get(&draft.user_id)
            .cloned()
            .ok_or(DeskError::UserNotFound(draft.user_id))?;
        if let Some(conv_id) = &draft.conversation_id {
            if !state.conversations.contains_key(conv_id) {
                return Err(DeskError::ConversationNotFound(conv_id.clone()));
            }
        }

        let mut ticket_id = TicketId::generate(now);
        while state.tickets.contains_key(ticket_id.as_str()) {
            ticket_id = TicketId::generate(now);
        }

        state.next_ticket_key += 1;
        let ticket = Ticket {
            id: state.next_ticket_key,
            ticket_id: ticket_id.clone(),
            user_id: user.id,
            title: draft.title,
            description: draft.description,
            error_code: draft.error_code,
            priority: draft.priority,
            status: TicketStatus::Open,
            assigned_to: None,
            assigned_at: None,
            resolved_at: None,
            solution: None,
            conversation_id: draft.conversation_id,
            created_at: now,
            updated_at: now,
        };

        state.next_message_id += 1;
        let system_message = TicketMessage {
            id: state.next_message_id,
            ticket_key: ticket.id,
            sender_id: None,
            sender_type: SenderType::System,
            body: initial_message_body(user.system_config.as_ref(), draft.steps_tried.as_deref()),
            is_internal: false,
            created_at: now,
        };

        state.messages.insert(ticket.id, vec![system_message]);
        state.tickets.insert(ticket_id.as_str().to_string(), ticket.clone());
        tracing::info!(ticket_id = %ticket.ticket_id, user_id = user.id, "ticket filed");
        Ok((ticket, user))
    }

    pub fn ticket(&self, ticket_id: &str) -> Result<Ticket> {
        self.state
            .read()
            .tickets
            .get(ticket_id)
            .cloned()
            .ok_or_else(|| DeskError::TicketNotFound(ticket_id.to_string()))
    }

    /// Tickets belonging to a user, newest first, optionally filtered by
    /// status.
    pub fn tickets_for_user(&self, user_id: u64, status: Option<TicketStatus>) -> Vec<Ticket> {
        let state = self.state.read();
        let mut tickets: Vec<Ticket> = state
            .tickets
            .values()
            .filter(|t| t.user_id == user_id)
            .filter(|t| status.map_or(true, |s| t.status == s))
            .cloned()
            .collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tickets
    }

    /// Messages visible to the end user (internal staff notes excluded).
    pub fn visible_messages(&self, ticket_id: &str) -> Result<Vec<TicketMessage>> {
        let state = self.state.read();
        let ticket = state
            .tickets
            .get(ticket_id)
            .ok_or_else(|| DeskError::TicketNotFound(ticket_id.to_string()))?;
        Ok(state
            .messages
            .get(&ticket.id)
            .map(|msgs| msgs.iter().filter(|m| !m.is_internal).cloned().collect())
            .unwrap_or_default())
    }

    /// Append a user message, reopening a resolved ticket if needed.
    /// Returns the updated ticket, the stored message and whether the
    /// ticket was reopened.
    pub fn add_user_message(
        &self,
        ticket_id: &str,
        user_id: u64,
        body: String,
        now: DateTime<Utc>,
    ) -> Result<(Ticket, TicketMessage, bool)> {
        if body.trim().is_empty() {
            return Err(DeskError::validation("body", "must not be empty"));
        }
        let mut state = self.state.write();
        let ticket = state
            .tickets
            .get_mut(ticket_id)
            .ok_or_else(|| DeskError::TicketNotFound(ticket_id.to_string()))?;
        if ticket.user_id != user_id {
            return Err(DeskError::NotPermitted(user_id));
        }
        let reopened = ticket.record_user_message(now)?;
        let ticket = ticket.clone();

        state.next_message_id += 1;
        let message = TicketMessage {
            id: state.next_message_id,
            ticket_key: ticket.id,
            sender_id: Some(user_id),
            sender_type: SenderType::User,
            body,
            is_internal: false,
            created_at: now,
        };
        state.messages.entry(ticket.id).or_default().push(message.clone());
        Ok((ticket, message, reopened))
    }

    /// Inbound status sync from the support dashboard. Returns whether the
    /// payload was applied (false means it was stale and dropped).
    pub fn apply_status_update(&self, ticket_id: &str, update: &StatusUpdate) -> Result<bool> {
        let mut state = self.state.write();
        let ticket = state
            .tickets
            .get_mut(ticket_id)
            .ok_or_else(|| DeskError::TicketNotFound(ticket_id.to_string()))?;
        Ok(crashdesk_core::sync::apply_status_update(ticket, update))
    }

    pub fn create_conversation(
        &self,
        user_id: u64,
        error_code: Option<String>,
    ) -> Result<Conversation> {
        let mut state = self.state.write();
        if !state.users.contains_key(&user_id) {
            return Err(DeskError::UserNotFound(user_id));
        }
        state.next_conversation_key += 1;
        let now = Utc::now();
        let conversation = Conversation {
            id: state.next_conversation_key,
            conversation_id: uuid::Uuid::new_v4().to_string(),
            user_id,
            error_code,
            status: ConversationStatus::InProgress,
            escalated: false,
            escalation_reason: None,
            created_at: now,
            updated_at: now,
        };
        state
            .conversations
            .insert(conversation.conversation_id.clone(), conversation.clone());
        Ok(conversation)
    }

    pub fn conversation(&self, conversation_id: &str) -> Result<Conversation> {
        self.state
            .read()
            .conversations
            .get(conversation_id)
            .cloned()
            .ok_or_else(|| DeskError::ConversationNotFound(conversation_id.to_string()))
    }

    pub fn conversation_history(&self, conversation_id: &str) -> Result<Vec<ConversationMessage>> {
        let state = self.state.read();
        let conversation = state
            .conversations
            .get(conversation_id)
            .ok_or_else(|| DeskError::ConversationNotFound(conversation_id.to_string()))?;
        Ok(state.conversation_messages.get(&conversation.id).cloned().unwrap_or_default())
    }

    /// Persist one chat exchange and escalate the conversation when the
    /// assistant asked for it. The first escalation reason wins.
    pub fn record_chat(
        &self,
        conversation_id: &str,
        user_message: &str,
        reply: &AssistantReply,
        now: DateTime<Utc>,
    ) -> Result<Conversation> {
        let mut state = self.state.write();
        let conversation = state
            .conversations
            .get_mut(conversation_id)
            .ok_or_else(|| DeskError::ConversationNotFound(conversation_id.to_string()))?;
        conversation.updated_at = now;
        if reply.escalate && !conversation.escalated {
            let reason = reply
                .escalation_reason
                .clone()
                .unwrap_or_else(|| "unspecified".to_string());
            conversation.escalate(reason, now);
        }
        let conversation = conversation.clone();

        for (role, content) in [
            (MessageRole::User, user_message),
            (MessageRole::Assistant, reply.content.as_str()),
        ] {
            state.next_turn_id += 1;
            let turn = ConversationMessage {
                id: state.next_turn_id,
                conversation_key: conversation.id,
                role,
                content: content.to_string(),
                created_at: now,
            };
            state.conversation_messages.entry(conversation.id).or_default().push(turn);
        }
        Ok(conversation)
    }

    /// Record an analysis unless this user already has one for the same
    /// path. Returns the stored row and whether it is new.
    pub fn record_analysis(
        &self,
        user_id: u64,
        dump: &DumpFile,
        verdict: Verdict,
        now: DateTime<Utc>,
    ) -> (DumpAnalysis, bool) {
        let mut state = self.state.write();
        if let Some(existing) = state
            .analyses
            .iter()
            .find(|a| a.user_id == user_id && a.path == dump.path)
        {
            return (existing.clone(), false);
        }
        state.next_analysis_id += 1;
        let analysis = DumpAnalysis {
            id: state.next_analysis_id,
            user_id,
            path: dump.path.clone(),
            filename: dump.filename.clone(),
            size: dump.size,
            verdict,
            analyzed_at: now,
        };
        state.analyses.push(analysis.clone());
        (analysis, true)
    }

    pub fn analyses_for_user(&self, user_id: u64) -> Vec<DumpAnalysis> {
        self.state
            .read()
            .analyses
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect()
    }
}

fn initial_message_body(config: Option<&SystemConfig>, steps_tried: Option<&str>) -> String {
    let mut body = String::new();
    if let Some(steps) = steps_tried.map(str::trim).filter(|s| !s.is_empty()) {
        body.push_str("Steps already tried:\n");
        body.push_str(steps);
        body.push_str("\n\n");
    }
    match config {
        Some(config) => body.push_str(&config.summary()),
        None => body.push_str("System Configuration: not provided\n"),
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_user() -> (ClientStore, User) {
        let store = ClientStore::new();
        let user = store
            .create_user(
                "alice".into(),
                "alice@example.com".into(),
                Some(SystemConfig {
                    os_version: "Windows 11 23H2".into(),
                    processor: "Intel i7-13700K".into(),
                    ram_size: "32GB".into(),
                    storage_type: "nvme".into(),
                    ..Default::default()
                }),
            )
            .unwrap();
        (store, user)
    }

    fn draft(user_id: u64) -> TicketDraft {
        TicketDraft {
            user_id,
            title: "Blue screen when gaming".into(),
            description: "Machine bugchecks within minutes of starting any 3D game.".into(),
            error_code: Some("0x0000001E".into()),
            priority: Priority::High,
            steps_tried: Some("Reinstalled GPU drivers".into()),
            conversation_id: None,
        }
    }

    #[test]
    fn filing_creates_ticket_with_system_message() {
        let (store, user) = store_with_user();
        let (ticket, _) = store.file_ticket(draft(user.id), Utc::now()).unwrap();
        assert_eq!(ticket.status, TicketStatus::Open);
        assert!(ticket.ticket_id.as_str().starts_with("DUMP-"));

        let messages = store.visible_messages(ticket.ticket_id.as_str()).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender_type, SenderType::System);
        assert!(messages[0].body.contains("Steps already tried:"));
        assert!(messages[0].body.contains("OS: Windows 11 23H2"));
    }

    #[test]
    fn filing_for_unknown_user_fails() {
        let store = ClientStore::new();
        assert!(matches!(
            store.file_ticket(draft(42), Utc::now()),
            Err(DeskError::UserNotFound(42))
        ));
    }

    #[test]
    fn user_message_on_resolved_ticket_reopens_it() {
        let (store, user) = store_with_user();
        let now = Utc::now();
        let (ticket, _) = store.file_ticket(draft(user.id), now).unwrap();
        let key = ticket.ticket_id.as_str().to_string();

        let update = StatusUpdate {
            status: TicketStatus::Resolved,
            solution: Some("Updated drivers".into()),
            updated_at: now + chrono::Duration::seconds(60),
        };
        assert!(store.apply_status_update(&key, &update).unwrap());

        let later = now + chrono::Duration::seconds(120);
        let (ticket, _, reopened) = store
            .add_user_message(&key, user.id, "Still crashing".into(), later)
            .unwrap();
        assert!(reopened);
        assert_eq!(ticket.status, TicketStatus::InProgress);
        assert!(ticket.resolved_at.is_none());
    }

    #[test]
    fn foreign_user_cannot_post_on_ticket() {
        let (store, user) = store_with_user();
        let (ticket, _) = store.file_ticket(draft(user.id), Utc::now()).unwrap();
        let err = store.add_user_message(
            ticket.ticket_id.as_str(),
            user.id + 1,
            "hello".into(),
            Utc::now(),
        );
        assert!(matches!(err, Err(DeskError::NotPermitted(_))));
    }

    #[test]
    fn internal_notes_are_hidden_from_users() {
        let (store, user) = store_with_user();
        let (ticket, _) = store.file_ticket(draft(user.id), Utc::now()).unwrap();
        {
            let mut state = store.state.write();
            state.next_message_id += 1;
            let id = state.next_message_id;
            state.messages.entry(ticket.id).or_default().push(TicketMessage {
                id,
                ticket_key: ticket.id,
                sender_id: Some(99),
                sender_type: SenderType::Support,
                body: "internal triage note".into(),
                is_internal: true,
                created_at: Utc::now(),
            });
        }
        let visible = store.visible_messages(ticket.ticket_id.as_str()).unwrap();
        assert!(visible.iter().all(|m| !m.is_internal));
    }

    #[test]
    fn chat_escalation_sticks_with_first_reason() {
        let (store, user) = store_with_user();
        let conv = store.create_conversation(user.id, Some("0x0000001E".into())).unwrap();
        let now = Utc::now();

        let escalating = AssistantReply {
            content: "You need hands-on help.".into(),
            escalate: true,
            escalation_reason: Some("hardware failure".into()),
        };
        let conv2 = store.record_chat(&conv.conversation_id, "help", &escalating, now).unwrap();
        assert_eq!(conv2.status, ConversationStatus::Escalated);
        assert_eq!(conv2.escalation_reason.as_deref(), Some("hardware failure"));

        let second = AssistantReply {
            content: "Escalating again.".into(),
            escalate: true,
            escalation_reason: Some("other reason".into()),
        };
        let conv3 = store.record_chat(&conv.conversation_id, "ok", &second, now).unwrap();
        assert_eq!(conv3.escalation_reason.as_deref(), Some("hardware failure"));

        let history = store.conversation_history(&conv.conversation_id).unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].role, MessageRole::User);
        assert_eq!(history[1].role, MessageRole::Assistant);
    }

    #[test]
    fn analysis_dedupes_per_user_and_path() {
        let (store, user) = store_with_user();
        let dump = DumpFile {
            path: PathBuf::from("/dumps/crash1.dmp"),
            filename: "crash1.dmp".into(),
            size: 4096,
            modified: Utc::now(),
        };
        let (_, fresh) = store.record_analysis(user.id, &dump, Verdict::Unknown, Utc::now());
        assert!(fresh);
        let (_, fresh) = store.record_analysis(user.id, &dump, Verdict::Unknown, Utc::now());
        assert!(!fresh);
        assert_eq!(store.analyses_for_user(user.id).len(), 1);
    }
}
