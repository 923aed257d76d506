//! Round-robin agent selection
//!
//! The next candidate is the available agent (role `agent`) with the oldest
//! `last_assigned`, never-assigned agents first. Ties resolve by agent id
//! ascending so selection is deterministic regardless of store iteration
//! order.

use crate::domain::Agent;

/// Pick the next agent for assignment, or `None` when nobody is available.
/// Running dry is a valid terminal state, not an error: the ticket stays
/// unassigned pending manual triage.
pub fn next_agent(agents: &[Agent]) -> Option<&Agent> {
    agents
        .iter()
        .filter(|a| a.can_take_ticket())
        .min_by_key(|a| (a.last_assigned, a.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AgentRole;
    use chrono::{Duration, Utc};

    fn agent(id: u64, role: AgentRole, available: bool, offset_mins: Option<i64>) -> Agent {
        let mut a = Agent::new(id, format!("agent{id}"), format!("agent{id}@crashdesk.test"), role);
        a.is_available = available;
        a.last_assigned = offset_mins.map(|m| Utc::now() + Duration::minutes(m));
        a
    }

    #[test]
    fn never_assigned_takes_priority() {
        let agents = vec![
            agent(2, AgentRole::Agent, true, Some(10)),
            agent(1, AgentRole::Agent, true, None),
            agent(3, AgentRole::Agent, true, Some(20)),
        ];
        assert_eq!(next_agent(&agents).unwrap().id, 1);
    }

    #[test]
    fn oldest_assignment_wins_after_null() {
        let t1 = agent(2, AgentRole::Agent, true, Some(10));
        let t2 = agent(3, AgentRole::Agent, true, Some(20));
        assert_eq!(next_agent(&[t1, t2]).unwrap().id, 2);
    }

    #[test]
    fn unavailable_and_managers_never_selected() {
        let agents = vec![
            agent(1, AgentRole::Agent, false, None),
            agent(2, AgentRole::Manager, true, None),
        ];
        assert!(next_agent(&agents).is_none());
    }

    #[test]
    fn ties_break_by_agent_id() {
        let agents = vec![
            agent(9, AgentRole::Agent, true, None),
            agent(4, AgentRole::Agent, true, None),
        ];
        assert_eq!(next_agent(&agents).unwrap().id, 4);
    }

    #[test]
    fn rotation_over_successive_assignments() {
        // A has never been assigned, B before C; selection order is A, B, C.
        let mut agents = vec![
            agent(1, AgentRole::Agent, true, None),
            agent(2, AgentRole::Agent, true, Some(0)),
            agent(3, AgentRole::Agent, true, Some(5)),
        ];
        let mut order = Vec::new();
        for step in 0..3 {
            let id = next_agent(&agents).unwrap().id;
            order.push(id);
            let bump = Utc::now() + Duration::minutes(60 + step);
            agents.iter_mut().find(|a| a.id == id).unwrap().last_assigned = Some(bump);
        }
        assert_eq!(order, vec![1, 2, 3]);
    }
}
