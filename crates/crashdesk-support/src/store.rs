//! In-memory support-side store
//!
//! Independent of the client's store: tickets arrive here through the
//! create notification and diverge only as far as status sync allows.
//! Assignment is the concurrency hot spot, so selection and the
//! `last_assigned` bump happen under one write lock, and self-assignment
//! is a compare-and-set on `assigned_to`.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crashdesk_core::sync::{KnowledgeUpdate, StatusUpdate, TicketNotification, UserUpdate};
use crashdesk_core::{
    roundrobin, Agent, AgentRole, DeskError, Result, SystemConfig, Ticket, TicketId, TicketStatus,
};

const KB_SOURCE: &str = "support_dashboard";

/// Requester details carried over from the create notification
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Requester {
    pub user_id: u64,
    pub username: String,
    pub email: String,
    pub system_config: Option<SystemConfig>,
}

/// A ticket as the support side sees it
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TicketRecord {
    pub ticket: Ticket,
    pub requester: Requester,
}

/// Result of an assignment attempt
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AssignmentOutcome {
    Assigned { agent_id: u64 },
    AlreadyAssigned { agent_id: u64 },
    NoAgentAvailable,
}

/// Per-agent queue size for the dashboard
#[derive(Clone, Debug, Serialize)]
pub struct AgentQueue {
    pub agent_id: u64,
    pub name: String,
    pub is_available: bool,
    pub active_tickets: usize,
}

/// Dashboard aggregate counts
#[derive(Clone, Debug, Serialize)]
pub struct Stats {
    pub total_tickets: usize,
    pub open: usize,
    pub in_progress: usize,
    pub pending_user: usize,
    pub resolved: usize,
    pub closed: usize,
    pub unassigned: usize,
    pub available_agents: usize,
    pub agent_queues: Vec<AgentQueue>,
}

/// List filters for the ticket queue endpoints
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct TicketFilter {
    #[serde(default)]
    pub status: Option<TicketStatus>,
    #[serde(default)]
    pub assigned_to: Option<u64>,
    #[serde(default)]
    pub unassigned: bool,
}

#[derive(Default)]
struct State {
    agents: HashMap<u64, Agent>,
    /// Keyed by the external ticket id
    tickets: HashMap<String, TicketRecord>,
    next_agent_id: u64,
    next_ticket_key: u64,
}

/// Support dashboard store
#[derive(Default)]
pub struct SupportStore {
    state: RwLock<State>,
}

impl SupportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_agent(
        &self,
        name: impl Into<String>,
        email: impl Into<String>,
        role: AgentRole,
    ) -> Agent {
        let mut state = self.state.write();
        state.next_agent_id += 1;
        let agent = Agent::new(state.next_agent_id, name, email, role);
        state.agents.insert(agent.id, agent.clone());
        agent
    }

    pub fn agents(&self) -> Vec<Agent> {
        let mut agents: Vec<Agent> = self.state.read().agents.values().cloned().collect();
        agents.sort_by_key(|a| a.id);
        agents
    }

    pub fn set_agent_availability(&self, agent_id: u64, is_available: bool) -> Result<Agent> {
        let mut state = self.state.write();
        let agent = state
            .agents
            .get_mut(&agent_id)
            .ok_or(DeskError::AgentNotFound(agent_id))?;
        agent.is_available = is_available;
        Ok(agent.clone())
    }

    /// Import a ticket from the client's create notification. Replays are
    /// idempotent: an already known ticket id returns the existing record
    /// untouched.
    pub fn import_ticket(&self, notification: &TicketNotification) -> Result<(TicketRecord, bool)> {
        let ticket_id = TicketId::parse(&notification.ticket_id)?;
        let mut state = self.state.write();
        if let Some(existing) = state.tickets.get(notification.ticket_id.as_str()) {
            return Ok((existing.clone(), false));
        }
        state.next_ticket_key += 1;
        let record = TicketRecord {
            ticket: Ticket {
                id: state.next_ticket_key,
                ticket_id,
                user_id: notification.user_id,
                title: notification.title.clone(),
                description: notification.description.clone(),
                error_code: notification.error_code.clone(),
                priority: notification.priority,
                status: notification.status,
                assigned_to: None,
                assigned_at: None,
                resolved_at: None,
                solution: None,
                conversation_id: None,
                created_at: notification.created_at,
                updated_at: notification.created_at,
            },
            requester: Requester {
                user_id: notification.user_id,
                username: notification.username.clone(),
                email: notification.email.clone(),
                system_config: notification.system_config.clone(),
            },
        };
        state
            .tickets
            .insert(notification.ticket_id.clone(), record.clone());
        tracing::info!(ticket_id = %notification.ticket_id, "ticket imported from client");
        Ok((record, true))
    }

    /// Round-robin auto-assignment. Selection and the fairness bump are one
    /// atomic step; an already assigned ticket reports its current assignee
    /// without re-bumping anyone.
    pub fn assign_round_robin(
        &self,
        ticket_id: &str,
        now: DateTime<Utc>,
    ) -> Result<AssignmentOutcome> {
        let mut state = self.state.write();
        let record = state
            .tickets
            .get(ticket_id)
            .ok_or_else(|| DeskError::TicketNotFound(ticket_id.to_string()))?;
        if let Some(agent_id) = record.ticket.assigned_to {
            return Ok(AssignmentOutcome::AlreadyAssigned { agent_id });
        }

        let candidates: Vec<Agent> = state.agents.values().cloned().collect();
        let Some(agent_id) = roundrobin::next_agent(&candidates).map(|a| a.id) else {
            tracing::warn!(%ticket_id, "no agent available, ticket stays unassigned");
            return Ok(AssignmentOutcome::NoAgentAvailable);
        };

        if let Some(agent) = state.agents.get_mut(&agent_id) {
            agent.last_assigned = Some(now);
        }
        if let Some(record) = state.tickets.get_mut(ticket_id) {
            record.ticket.assign(agent_id, now);
        }
        tracing::info!(%ticket_id, agent_id, "ticket auto-assigned");
        Ok(AssignmentOutcome::Assigned { agent_id })
    }

    /// Manual assignment. Managers assign anyone unconditionally; agents
    /// may only claim an unassigned ticket for themselves, and the claim is
    /// a compare-and-set so exactly one concurrent claimer wins.
    pub fn manual_assign(
        &self,
        ticket_id: &str,
        requested_by: u64,
        target: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<Ticket> {
        let mut state = self.state.write();
        let requester = state
            .agents
            .get(&requested_by)
            .ok_or(DeskError::AgentNotFound(requested_by))?
            .clone();

        let target_id = target.unwrap_or(requested_by);
        if requester.role != AgentRole::Manager {
            if target_id != requested_by {
                return Err(DeskError::NotPermitted(requested_by));
            }
            let record = state
                .tickets
                .get(ticket_id)
                .ok_or_else(|| DeskError::TicketNotFound(ticket_id.to_string()))?;
            if let Some(current) = record.ticket.assigned_to {
                return Err(DeskError::AlreadyAssigned {
                    ticket_id: ticket_id.to_string(),
                    agent_id: current,
                });
            }
        }
        if !state.agents.contains_key(&target_id) {
            return Err(DeskError::AgentNotFound(target_id));
        }

        let record = state
            .tickets
            .get_mut(ticket_id)
            .ok_or_else(|| DeskError::TicketNotFound(ticket_id.to_string()))?;
        record.ticket.assign(target_id, now);
        let ticket = record.ticket.clone();
        if let Some(agent) = state.agents.get_mut(&target_id) {
            agent.last_assigned = Some(now);
        }
        tracing::info!(%ticket_id, agent_id = target_id, requested_by, "ticket manually assigned");
        Ok(ticket)
    }

    /// Staff status change. Returns the updated ticket, the status-sync
    /// payload for the client, and the knowledge-base push when a ticket
    /// with an error code was resolved.
    pub fn update_status(
        &self,
        ticket_id: &str,
        status: TicketStatus,
        solution: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(Ticket, StatusUpdate, Option<KnowledgeUpdate>)> {
        let mut state = self.state.write();
        let record = state
            .tickets
            .get_mut(ticket_id)
            .ok_or_else(|| DeskError::TicketNotFound(ticket_id.to_string()))?;
        record.ticket.set_status(status, solution, now)?;
        let ticket = record.ticket.clone();

        let sync = StatusUpdate {
            status: ticket.status,
            solution: ticket.solution.clone(),
            updated_at: ticket.updated_at,
        };
        let kb = match (&ticket.error_code, &ticket.solution, status) {
            (Some(code), Some(solution), TicketStatus::Resolved) => Some(KnowledgeUpdate {
                error_code: code.clone(),
                solution: solution.clone(),
                source: KB_SOURCE.to_string(),
            }),
            _ => None,
        };
        Ok((ticket, sync, kb))
    }

    /// Inbound user-update sync from the client. Returns whether the
    /// payload was applied (false means stale, dropped).
    pub fn apply_user_update(&self, ticket_id: &str, update: &UserUpdate) -> Result<bool> {
        let mut state = self.state.write();
        let record = state
            .tickets
            .get_mut(ticket_id)
            .ok_or_else(|| DeskError::TicketNotFound(ticket_id.to_string()))?;
        Ok(crashdesk_core::sync::apply_user_update(&mut record.ticket, update))
    }

    pub fn ticket(&self, ticket_id: &str) -> Result<TicketRecord> {
        self.state
            .read()
            .tickets
            .get(ticket_id)
            .cloned()
            .ok_or_else(|| DeskError::TicketNotFound(ticket_id.to_string()))
    }

    /// Filtered ticket queue, newest first.
    pub fn tickets(&self, filter: TicketFilter) -> Vec<TicketRecord> {
        let state = self.state.read();
        let mut records: Vec<TicketRecord> = state
            .tickets
            .values()
            .filter(|r| filter.status.map_or(true, |s| r.ticket.status == s))
            .filter(|r| filter.assigned_to.map_or(true, |a| r.ticket.assigned_to == Some(a)))
            .filter(|r| !filter.unassigned || r.ticket.assigned_to.is_none())
            .cloned()
            .collect();
        records.sort_by(|a, b| b.ticket.created_at.cmp(&a.ticket.created_at));
        records
    }

    pub fn stats(&self) -> Stats {
        let state = self.state.read();
        let count = |status: TicketStatus| {
            state.tickets.values().filter(|r| r.ticket.status == status).count()
        };
        let mut agent_queues: Vec<AgentQueue> = state
            .agents
            .values()
            .filter(|a| a.role == AgentRole::Agent)
            .map(|a| AgentQueue {
                agent_id: a.id,
                name: a.name.clone(),
                is_available: a.is_available,
                active_tickets: state
                    .tickets
                    .values()
                    .filter(|r| {
                        r.ticket.assigned_to == Some(a.id)
                            && !matches!(
                                r.ticket.status,
                                TicketStatus::Resolved | TicketStatus::Closed
                            )
                    })
                    .count(),
            })
            .collect();
        agent_queues.sort_by_key(|q| q.agent_id);

        Stats {
            total_tickets: state.tickets.len(),
            open: count(TicketStatus::Open),
            in_progress: count(TicketStatus::InProgress),
            pending_user: count(TicketStatus::PendingUser),
            resolved: count(TicketStatus::Resolved),
            closed: count(TicketStatus::Closed),
            unassigned: state
                .tickets
                .values()
                .filter(|r| r.ticket.assigned_to.is_none())
                .count(),
            available_agents: state.agents.values().filter(|a| a.can_take_ticket()).count(),
            agent_queues,
        }
    }
}
