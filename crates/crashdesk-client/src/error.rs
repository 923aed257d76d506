//! HTTP error mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crashdesk_core::{ApiResponse, DeskError};

/// Wrapper turning [`DeskError`] into a JSON error response.
#[derive(Debug)]
pub struct ApiError(pub DeskError);

impl From<DeskError> for ApiError {
    fn from(err: DeskError) -> Self {
        Self(err)
    }
}

impl From<crashdesk_analyzer::AnalyzerError> for ApiError {
    fn from(err: crashdesk_analyzer::AnalyzerError) -> Self {
        use crashdesk_analyzer::AnalyzerError;
        Self(match err {
            AnalyzerError::Io(e) => DeskError::Io(e),
            AnalyzerError::Serialization(e) => DeskError::Serialization(e),
            AnalyzerError::KnowledgeBase(msg) => DeskError::validation("knowledge_base", msg),
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            DeskError::Validation { .. } => (StatusCode::BAD_REQUEST, "validation_error"),
            DeskError::SolutionRequired => (StatusCode::BAD_REQUEST, "solution_required"),
            DeskError::TicketNotFound(_) => (StatusCode::NOT_FOUND, "ticket_not_found"),
            DeskError::AgentNotFound(_) => (StatusCode::NOT_FOUND, "agent_not_found"),
            DeskError::UserNotFound(_) => (StatusCode::NOT_FOUND, "user_not_found"),
            DeskError::ConversationNotFound(_) => {
                (StatusCode::NOT_FOUND, "conversation_not_found")
            }
            DeskError::AlreadyAssigned { .. } => (StatusCode::CONFLICT, "already_assigned"),
            DeskError::TicketLocked(_) => (StatusCode::CONFLICT, "ticket_locked"),
            DeskError::NotPermitted(_) => (StatusCode::FORBIDDEN, "not_permitted"),
            DeskError::Remote { .. } => (StatusCode::BAD_GATEWAY, "remote_error"),
            DeskError::Io(_) | DeskError::Serialization(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = Json(ApiResponse::<()>::error(code, self.0.to_string()));
        (status, body).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_error_classes() {
        let cases = [
            (DeskError::validation("title", "too short"), StatusCode::BAD_REQUEST),
            (DeskError::TicketNotFound("DUMP-1".into()), StatusCode::NOT_FOUND),
            (
                DeskError::AlreadyAssigned { ticket_id: "DUMP-1".into(), agent_id: 2 },
                StatusCode::CONFLICT,
            ),
            (DeskError::NotPermitted(3), StatusCode::FORBIDDEN),
            (
                DeskError::Remote { url: "http://x".into(), reason: "timeout".into() },
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError(err).into_response().status(), expected);
        }
    }
}
