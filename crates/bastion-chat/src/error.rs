//! Chat-driver errors and their HTTP status mapping (§6, §7).

use std::borrow::Cow;

use thiserror::Error;

use bastion_llm::LlmError;
use bastion_orchestrator::OrchestratorError;

/// Errors the chat driver can surface, either as a JSON error body or as
/// a terminal `error` SSE event.
#[derive(Debug, Error)]
pub enum ChatError {
    /// A pipeline phase failed or a plugin was denied permission.
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    /// The LLM provider failed.
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// `conversationId` was supplied but no such conversation exists.
    #[error("conversation not found: {0}")]
    ConversationNotFound(String),
}

impl ChatError {
    /// The stable error code surfaced in the JSON/SSE error body, when
    /// one applies.
    #[must_use]
    pub fn code(&self) -> Option<Cow<'static, str>> {
        match self {
            Self::Orchestrator(e) => Some(e.code()),
            Self::Llm(_) => None,
            Self::ConversationNotFound(_) => Some(Cow::Borrowed("CONVERSATION_NOT_FOUND")),
        }
    }

    /// The HTTP status this error maps to (§6 "400/403/404/500 as
    /// appropriate").
    #[must_use]
    pub fn status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self.code().as_deref() {
            Some("PERMISSION_DENIED") => StatusCode::FORBIDDEN,
            Some("PLUGIN_NOT_FOUND" | "CONVERSATION_NOT_FOUND") => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The id of the plugin that blocked this request, if this error
    /// originated from a permission denial or hook failure (§6 `blockedBy`).
    #[must_use]
    pub fn blocked_by(&self) -> Option<String> {
        match self {
            Self::Orchestrator(e) => e.blocked_by().map(|id| id.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_core::PluginId;
    use bastion_permissions::PermissionError;

    #[test]
    fn unknown_conversation_maps_to_404() {
        let err = ChatError::ConversationNotFound("conv-1".to_string());
        assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);
        assert_eq!(err.code().as_deref(), Some("CONVERSATION_NOT_FOUND"));
    }

    #[test]
    fn unknown_plugin_maps_to_404() {
        let err = ChatError::Orchestrator(OrchestratorError::PluginNotFound(
            PluginId::parse("ghost").unwrap(),
        ));
        assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);
    }

    #[test]
    fn hook_failure_names_the_blocking_plugin() {
        let err = ChatError::Orchestrator(OrchestratorError::HookFailed {
            plugin_id: PluginId::parse("blocker").unwrap(),
            source: bastion_bridge::BridgeError::HookTimeout,
        });
        assert_eq!(err.blocked_by(), Some("blocker".to_string()));
    }

    #[test]
    fn permission_denial_names_the_blocking_plugin() {
        let err = ChatError::Orchestrator(OrchestratorError::Permission(PermissionError::new(
            PluginId::parse("guarded").unwrap(),
            "db.tables",
            "SELECT * FROM users",
        )));
        assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);
        assert_eq!(err.code().as_deref(), Some("PERMISSION_DENIED"));
        assert_eq!(err.blocked_by(), Some("guarded".to_string()));
    }
}
