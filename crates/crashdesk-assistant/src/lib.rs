//! AI troubleshooting assistant
//!
//! Wraps a remote chat-completion endpoint behind the [`Assistant`] trait.
//! The assistant is optional: when no endpoint is configured every reply is
//! a canned fallback that escalates the conversation to human support, so
//! callers never need to branch on availability themselves.
//!
//! Escalation is signalled in-band. The model is instructed to end a reply
//! with `[ESCALATE: reason]` when the problem is beyond self-service; the
//! marker is stripped from the text shown to the user and surfaced as a
//! structured field instead.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crashdesk_core::MessageRole;

/// How many prior turns travel with each request
const HISTORY_WINDOW: usize = 10;

const ESCALATE_MARKER: &str = "[ESCALATE:";

const SYSTEM_PROMPT: &str = "You are a technical support assistant helping users \
troubleshoot Windows crash errors (blue screen / bug check events). Give clear, \
step-by-step guidance a non-expert can follow. If the problem appears to require \
hands-on support, hardware replacement, or data recovery, end your reply with \
[ESCALATE: short reason].";

const UNAVAILABLE_REPLY: &str = "The troubleshooting assistant is currently \
unavailable. Your conversation has been flagged for a human support agent.";

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("assistant request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed assistant response: {0}")]
    Malformed(String),
}

/// One prior exchange in the conversation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Turn {
    pub role: MessageRole,
    pub content: String,
}

/// What the assistant said, with the escalation marker already parsed out
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssistantReply {
    pub content: String,
    pub escalate: bool,
    pub escalation_reason: Option<String>,
}

impl AssistantReply {
    fn plain(content: String) -> Self {
        Self { content, escalate: false, escalation_reason: None }
    }

    fn unavailable() -> Self {
        Self {
            content: UNAVAILABLE_REPLY.to_string(),
            escalate: true,
            escalation_reason: Some("ai_unavailable".to_string()),
        }
    }
}

/// Assistant seam consumed by the client application
#[async_trait]
pub trait Assistant: Send + Sync {
    fn is_configured(&self) -> bool;

    /// Produce a reply to `message` given the conversation so far. Never
    /// fails: transport problems degrade to an escalating fallback reply.
    async fn reply(&self, message: &str, error_code: Option<&str>, history: &[Turn])
        -> AssistantReply;
}

/// Split the escalation trailer off a raw model reply.
pub fn parse_escalation(raw: &str) -> (String, Option<String>) {
    let Some(start) = raw.rfind(ESCALATE_MARKER) else {
        return (raw.trim().to_string(), None);
    };
    let after = &raw[start + ESCALATE_MARKER.len()..];
    let Some(end) = after.find(']') else {
        return (raw.trim().to_string(), None);
    };
    let reason = after[..end].trim().to_string();
    let mut content = String::with_capacity(raw.len());
    content.push_str(&raw[..start]);
    content.push_str(&after[end + 1..]);
    let reason = if reason.is_empty() { "unspecified".to_string() } else { reason };
    (content.trim().to_string(), Some(reason))
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Assistant backed by an HTTP chat-completion endpoint
pub struct HttpAssistant {
    client: reqwest::Client,
    endpoint: Option<String>,
    api_key: Option<String>,
}

impl HttpAssistant {
    /// `endpoint: None` yields a permanently-unavailable assistant; the
    /// client app still runs, it just escalates every chat.
    pub fn new(endpoint: Option<String>, api_key: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client, endpoint, api_key }
    }

    async fn request(
        &self,
        endpoint: &str,
        message: &str,
        error_code: Option<&str>,
        history: &[Turn],
    ) -> Result<String, AssistantError> {
        let context = build_context(error_code);
        let mut messages = vec![ChatMessage { role: "system", content: &context }];
        let recent = &history[history.len().saturating_sub(HISTORY_WINDOW)..];
        for turn in recent {
            let role = match turn.role {
                MessageRole::User => "user",
                MessageRole::Assistant => "assistant",
            };
            messages.push(ChatMessage { role, content: &turn.content });
        }
        messages.push(ChatMessage { role: "user", content: message });

        let mut req = self.client.post(endpoint).json(&ChatRequest { messages });
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let response: ChatResponse = req.send().await?.error_for_status()?.json().await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AssistantError::Malformed("empty choices".to_string()))?;
        Ok(content)
    }
}

fn build_context(error_code: Option<&str>) -> String {
    match error_code {
        Some(code) => format!("{SYSTEM_PROMPT}\n\nThe user's system reported error code {code}."),
        None => SYSTEM_PROMPT.to_string(),
    }
}

#[async_trait]
impl Assistant for HttpAssistant {
    fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    async fn reply(
        &self,
        message: &str,
        error_code: Option<&str>,
        history: &[Turn],
    ) -> AssistantReply {
        let Some(endpoint) = &self.endpoint else {
            return AssistantReply::unavailable();
        };
        match self.request(endpoint, message, error_code, history).await {
            Ok(raw) => {
                let (content, reason) = parse_escalation(&raw);
                AssistantReply { content, escalate: reason.is_some(), escalation_reason: reason }
            }
            Err(err) => {
                tracing::warn!(%err, "assistant request failed, escalating");
                AssistantReply::unavailable()
            }
        }
    }
}

/// Test double replaying canned raw replies in order
pub struct ScriptedAssistant {
    replies: parking_lot::Mutex<Vec<String>>,
}

impl ScriptedAssistant {
    pub fn new(replies: Vec<&str>) -> Self {
        let mut replies: Vec<String> = replies.into_iter().map(String::from).collect();
        replies.reverse();
        Self { replies: parking_lot::Mutex::new(replies) }
    }
}

#[async_trait]
impl Assistant for ScriptedAssistant {
    fn is_configured(&self) -> bool {
        true
    }

    async fn reply(&self, _: &str, _: Option<&str>, _: &[Turn]) -> AssistantReply {
        let raw = self
            .replies
            .lock()
            .pop()
            .unwrap_or_else(|| "I have no further suggestions.".to_string());
        let (content, reason) = parse_escalation(&raw);
        AssistantReply { content, escalate: reason.is_some(), escalation_reason: reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escalation_trailer_is_split_off() {
        let (content, reason) =
            parse_escalation("Try reseating the RAM.\n[ESCALATE: suspected hardware failure]");
        assert_eq!(content, "Try reseating the RAM.");
        assert_eq!(reason.as_deref(), Some("suspected hardware failure"));
    }

    #[test]
    fn reply_without_marker_is_untouched() {
        let (content, reason) = parse_escalation("Run sfc /scannow and reboot.");
        assert_eq!(content, "Run sfc /scannow and reboot.");
        assert!(reason.is_none());
    }

    #[test]
    fn unterminated_marker_is_left_in_place() {
        let (content, reason) = parse_escalation("Some advice [ESCALATE: oops");
        assert_eq!(content, "Some advice [ESCALATE: oops");
        assert!(reason.is_none());
    }

    #[test]
    fn empty_reason_defaults_to_unspecified() {
        let (_, reason) = parse_escalation("Done. [ESCALATE: ]");
        assert_eq!(reason.as_deref(), Some("unspecified"));
    }

    #[tokio::test]
    async fn unconfigured_assistant_escalates_every_reply() {
        let assistant = HttpAssistant::new(None, None, Duration::from_secs(5));
        assert!(!assistant.is_configured());
        let reply = assistant.reply("help", None, &[]).await;
        assert!(reply.escalate);
        assert_eq!(reply.escalation_reason.as_deref(), Some("ai_unavailable"));
    }

    #[tokio::test]
    async fn scripted_assistant_replays_in_order() {
        let assistant =
            ScriptedAssistant::new(vec!["First answer", "Second [ESCALATE: give up]"]);
        let first = assistant.reply("a", None, &[]).await;
        assert_eq!(first.content, "First answer");
        assert!(!first.escalate);
        let second = assistant.reply("b", None, &[]).await;
        assert_eq!(second.content, "Second");
        assert_eq!(second.escalation_reason.as_deref(), Some("give up"));
    }

    #[test]
    fn context_mentions_error_code_when_known() {
        let ctx = build_context(Some("0X0000001E"));
        assert!(ctx.contains("0X0000001E"));
    }
}
