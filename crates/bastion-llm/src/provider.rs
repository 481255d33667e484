//! The `LlmProvider` contract the chat driver and orchestrator consume.
//!
//! The actual model backend is an external collaborator (spec.md §1); this
//! crate defines the seam plus a scripted test double used by
//! `bastion-orchestrator`/`bastion-chat` tests.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::LlmResult;
use crate::types::{LlmResponse, LlmToolDefinition, Message, StreamEvent};

/// A boxed stream of streaming events.
pub type StreamBox = Pin<Box<dyn Stream<Item = LlmResult<StreamEvent>> + Send>>;

/// Language-model access, with streaming and non-streaming completion.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// The provider's name, for logging.
    fn name(&self) -> &str;

    /// Stream a completion over `messages`, advertising `tools` and using
    /// `system` as the system prompt.
    async fn stream(
        &self,
        messages: &[Message],
        tools: &[LlmToolDefinition],
        system: &str,
    ) -> LlmResult<StreamBox>;

    /// Complete without streaming (used for the synthesis fallback call,
    /// §4.9).
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[LlmToolDefinition],
        system: &str,
    ) -> LlmResult<LlmResponse>;

    /// Approximate token count for `text`.
    fn count_tokens(&self, text: &str) -> usize {
        text.len() / 4
    }

    /// The provider's maximum context length, in tokens.
    fn max_context_length(&self) -> usize;
}

#[async_trait]
impl LlmProvider for Box<dyn LlmProvider> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn stream(
        &self,
        messages: &[Message],
        tools: &[LlmToolDefinition],
        system: &str,
    ) -> LlmResult<StreamBox> {
        (**self).stream(messages, tools, system).await
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[LlmToolDefinition],
        system: &str,
    ) -> LlmResult<LlmResponse> {
        (**self).complete(messages, tools, system).await
    }

    fn count_tokens(&self, text: &str) -> usize {
        (**self).count_tokens(text)
    }

    fn max_context_length(&self) -> usize {
        (**self).max_context_length()
    }
}

/// A scripted provider for tests: downstream crates (`bastion-orchestrator`,
/// `bastion-chat`) construct one instead of wiring a real backend.
pub mod testing {
    use super::{LlmProvider, LlmResponse, LlmResult, LlmToolDefinition, Message, StreamBox};
    use crate::types::{MessageContent, MessageRole, StreamEvent, Usage};
    use async_trait::async_trait;
    use futures::stream;

    /// Replays a fixed final text on both `stream` and `complete`.
    pub struct ScriptedProvider {
        /// The text every call returns.
        pub final_text: String,
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn stream(
            &self,
            _messages: &[Message],
            _tools: &[LlmToolDefinition],
            _system: &str,
        ) -> LlmResult<StreamBox> {
            let events = vec![
                Ok(StreamEvent::TextDelta(self.final_text.clone())),
                Ok(StreamEvent::Done),
            ];
            Ok(Box::pin(stream::iter(events)))
        }

        async fn complete(
            &self,
            _messages: &[Message],
            _tools: &[LlmToolDefinition],
            _system: &str,
        ) -> LlmResult<LlmResponse> {
            Ok(LlmResponse {
                message: Message {
                    role: MessageRole::Assistant,
                    content: MessageContent::Text(self.final_text.clone()),
                },
                has_tool_calls: false,
                usage: Usage::default(),
            })
        }

        fn max_context_length(&self) -> usize {
            200_000
        }
    }
}
