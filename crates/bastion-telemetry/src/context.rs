use uuid::Uuid;

/// Correlation context for one chat request, threaded through a single
/// `tracing::Span` for the lifetime of its pipeline run.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Uuid,
    component: String,
    conversation_id: Option<String>,
}

impl RequestContext {
    /// Start a new request context for `component` (e.g. `"chat-driver"`).
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            component: component.into(),
            conversation_id: None,
        }
    }

    /// Attach a conversation id, shown in every log line within the span.
    #[must_use]
    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    /// The request id assigned at construction.
    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Build the `tracing::Span` carrying this context's fields.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "request",
            component = %self.component,
            request_id = %self.request_id,
            conversation_id = self.conversation_id.as_deref().unwrap_or("none"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_are_unique() {
        let a = RequestContext::new("chat-driver");
        let b = RequestContext::new("chat-driver");
        assert_ne!(a.request_id(), b.request_id());
    }

    #[test]
    fn with_conversation_sets_field() {
        let ctx = RequestContext::new("chat-driver").with_conversation("conv-1");
        assert_eq!(ctx.conversation_id.as_deref(), Some("conv-1"));
    }
}
