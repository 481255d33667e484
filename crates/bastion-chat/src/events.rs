//! SSE event types and framing (§4.9).

use serde::Serialize;
use serde_json::Value;

/// One SSE event emitted on a chat response stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ChatEvent {
    /// First event: conversation id and the persisted user-message id.
    #[serde(rename = "meta")]
    Meta {
        /// Conversation id.
        #[serde(rename = "conversationId")]
        conversation_id: String,
        /// The persisted user message's id.
        #[serde(rename = "userMessageId")]
        user_message_id: String,
    },
    /// A fragment of assistant text.
    #[serde(rename = "delta")]
    Delta {
        /// The text fragment.
        text: String,
    },
    /// A tool or skill invocation began.
    #[serde(rename = "tool_start")]
    ToolStart {
        /// Namespaced tool/skill name.
        name: String,
    },
    /// A tool or skill invocation completed successfully.
    #[serde(rename = "tool_result")]
    ToolResult {
        /// Namespaced tool/skill name.
        name: String,
        /// Result payload.
        result: Value,
    },
    /// A tool or skill invocation failed.
    #[serde(rename = "tool_error")]
    ToolError {
        /// Namespaced tool/skill name.
        name: String,
        /// Error message.
        message: String,
    },
    /// Terminal event: the assistant reply is final.
    #[serde(rename = "done")]
    Done {
        /// Conversation id.
        #[serde(rename = "conversationId")]
        conversation_id: String,
        /// The persisted user message's id.
        #[serde(rename = "userMessageId")]
        user_message_id: String,
        /// The persisted assistant message's id.
        #[serde(rename = "assistantMessageId")]
        assistant_message_id: String,
        /// The final assistant text.
        response: String,
        /// Summary of every tool/skill call made while producing the
        /// response.
        #[serde(rename = "toolCalls")]
        tool_calls: Vec<Value>,
    },
    /// Terminal event: the turn failed.
    #[serde(rename = "error")]
    Error {
        /// Human-readable message.
        message: String,
        /// Stable error code, when one is available.
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        /// The plugin that blocked this request, when the failure
        /// originated from a permission denial or hook failure (§6).
        #[serde(rename = "blockedBy", skip_serializing_if = "Option::is_none")]
        blocked_by: Option<String>,
    },
}

impl ChatEvent {
    /// Whether this event ends the stream (§4.9: closed exactly once).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }

    /// The SSE `event:` name for this variant.
    #[must_use]
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Meta { .. } => "meta",
            Self::Delta { .. } => "delta",
            Self::ToolStart { .. } => "tool_start",
            Self::ToolResult { .. } => "tool_result",
            Self::ToolError { .. } => "tool_error",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_and_error_are_terminal() {
        assert!(ChatEvent::Done {
            conversation_id: "c".into(),
            user_message_id: "u".into(),
            assistant_message_id: "a".into(),
            response: "hi".into(),
            tool_calls: Vec::new(),
        }
        .is_terminal());
        assert!(ChatEvent::Error {
            message: "boom".into(),
            code: None,
            blocked_by: None,
        }
        .is_terminal());
        assert!(!ChatEvent::Delta { text: "x".into() }.is_terminal());
    }

    #[test]
    fn event_name_matches_the_tag() {
        let event = ChatEvent::ToolStart { name: "weather__forecast".into() };
        assert_eq!(event.event_name(), "tool_start");
    }
}
