//! Message, tool, and streaming types exchanged with an [`crate::LlmProvider`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message in the assembled `[system, ...history, user]` sequence (§4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Message role.
    pub role: MessageRole,
    /// Message content.
    pub content: MessageContent,
}

impl Message {
    /// Build a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Build an assistant text message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Build a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Build an assistant message carrying tool calls.
    #[must_use]
    pub fn assistant_with_tools(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: MessageContent::ToolCalls(tool_calls),
        }
    }

    /// Build a tool-result message.
    #[must_use]
    pub fn tool_result(result: ToolCallResult) -> Self {
        Self {
            role: MessageRole::Tool,
            content: MessageContent::ToolResult(result),
        }
    }

    /// The message's text, if it is a plain text message.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Instructions to the model.
    System,
    /// The end user.
    User,
    /// The model's own output.
    Assistant,
    /// A tool's result, fed back to the model.
    Tool,
}

/// Message content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text.
    Text(String),
    /// One or more tool invocations requested by the model.
    ToolCalls(Vec<ToolCall>),
    /// The result of a previously requested tool call.
    ToolResult(ToolCallResult),
}

/// A tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call id.
    pub id: String,
    /// Namespaced tool name (`pluginId__localName`, §4.8).
    pub name: String,
    /// Tool arguments.
    pub arguments: Value,
}

/// Result of executing a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// The call id this responds to.
    pub call_id: String,
    /// Result content (text, or JSON-serialized error).
    pub content: String,
    /// Whether this is an error result.
    #[serde(default)]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Build a successful tool result.
    pub fn success(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Build an error tool result.
    pub fn error(call_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: error.into(),
            is_error: true,
        }
    }
}

/// A tool definition advertised to the model (§4.8 `collectTools`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmToolDefinition {
    /// Namespaced tool name.
    pub name: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// JSON schema for the tool's input.
    pub input_schema: Value,
}

/// One event in a streamed completion (§4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StreamEvent {
    /// Partial assistant text.
    TextDelta(String),
    /// A tool call began.
    ToolCallStart {
        /// Call id.
        id: String,
        /// Tool name.
        name: String,
    },
    /// Partial tool-call arguments JSON.
    ToolCallDelta {
        /// Call id.
        id: String,
        /// Partial arguments fragment.
        args_delta: String,
    },
    /// A tool call finished accumulating arguments.
    ToolCallEnd {
        /// Call id.
        id: String,
    },
    /// Token usage, if the provider reports it mid-stream.
    Usage {
        /// Input tokens.
        input_tokens: usize,
        /// Output tokens.
        output_tokens: usize,
    },
    /// The stream completed normally.
    Done,
    /// The stream failed.
    Error(String),
}

/// A non-streaming completion result.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// The response message.
    pub message: Message,
    /// Whether the response requests tool calls.
    pub has_tool_calls: bool,
    /// Token usage for the request.
    pub usage: Usage,
}

/// Token usage.
#[derive(Debug, Clone, Default)]
pub struct Usage {
    /// Input tokens consumed.
    pub input_tokens: usize,
    /// Output tokens generated.
    pub output_tokens: usize,
}

impl Usage {
    /// Total tokens consumed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}
