use thiserror::Error;

/// Errors raised by an [`crate::LlmProvider`].
#[derive(Debug, Error)]
pub enum LlmError {
    /// The provider's backing API rejected the request.
    #[error("provider request failed: {0}")]
    RequestFailed(String),

    /// The stream ended abnormally or emitted a malformed event.
    #[error("streaming error: {0}")]
    StreamingError(String),

    /// The assembled messages exceed the provider's context window.
    #[error("context length exceeded: {current} tokens, max is {max}")]
    ContextLengthExceeded {
        /// Current token count.
        current: usize,
        /// Maximum allowed.
        max: usize,
    },
}

/// Convenience alias for [`LlmError`]-returning results.
pub type LlmResult<T> = Result<T, LlmError>;
