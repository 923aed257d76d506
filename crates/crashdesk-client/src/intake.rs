//! Ticket intake validation and sync payload construction

use crashdesk_core::sync::TicketNotification;
use crashdesk_core::{DeskError, Result, Ticket, User};

use crate::store::TicketDraft;

const TITLE_MIN: usize = 5;
const TITLE_MAX: usize = 200;
const DESCRIPTION_MIN: usize = 20;
const DESCRIPTION_MAX: usize = 2000;

/// Validate a draft before anything is persisted. Rejections name the
/// offending field. Bounds count characters, not bytes, so multibyte
/// text is measured the way the user sees it.
pub fn validate(draft: &TicketDraft) -> Result<()> {
    let title_len = draft.title.trim().chars().count();
    if title_len < TITLE_MIN || title_len > TITLE_MAX {
        return Err(DeskError::validation(
            "title",
            format!("must be between {TITLE_MIN} and {TITLE_MAX} characters"),
        ));
    }
    let description_len = draft.description.trim().chars().count();
    if description_len < DESCRIPTION_MIN || description_len > DESCRIPTION_MAX {
        return Err(DeskError::validation(
            "description",
            format!("must be between {DESCRIPTION_MIN} and {DESCRIPTION_MAX} characters"),
        ));
    }
    Ok(())
}

/// Build the create notification pushed to the support dashboard. Carries
/// the full ticket payload because the support side keeps its own store.
pub fn notification(ticket: &Ticket, user: &User) -> TicketNotification {
    TicketNotification {
        ticket_id: ticket.ticket_id.to_string(),
        user_id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        title: ticket.title.clone(),
        description: ticket.description.clone(),
        error_code: ticket.error_code.clone(),
        priority: ticket.priority,
        status: ticket.status,
        created_at: ticket.created_at,
        system_config: user.system_config.clone(),
    }
}
