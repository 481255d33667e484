use std::borrow::Cow;

use bastion_core::ErrorKind;
use bastion_wire::WireError;

/// Errors raised by a [`crate::WorkerBridge`] (§4.7).
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The sandbox did not send `SANDBOX_READY` within its timeout.
    #[error("sandbox did not signal ready in time")]
    SandboxReadyTimeout,
    /// The `INIT` handshake failed or timed out.
    #[error("init handshake failed: {0}")]
    InitFailed(String),
    /// A hook call did not respond within its timeout.
    #[error("hook call timed out")]
    HookTimeout,
    /// A hook call's sandbox-side implementation raised an error.
    #[error("hook call failed: {} ({})", .0.message, .0.code)]
    HookFailed(WireError),
    /// The bridge has been shut down; no further calls are serviced.
    #[error("worker has been stopped")]
    WorkerStopped,
    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(String),
}

impl BridgeError {
    /// The stable wire error code for this error (§7). A hook failure
    /// carries forward the code the plugin's own handler raised; only a
    /// plugin that raised without a stable code falls back to the generic
    /// `HookError` kind.
    #[must_use]
    pub fn code(&self) -> Cow<'static, str> {
        match self {
            Self::SandboxReadyTimeout => Cow::Borrowed(ErrorKind::SandboxReadyTimeout.as_code()),
            Self::InitFailed(_) => Cow::Borrowed(ErrorKind::InitFailed.as_code()),
            Self::HookTimeout => Cow::Borrowed(ErrorKind::HookTimeout.as_code()),
            Self::HookFailed(e) if !e.code.is_empty() => Cow::Owned(e.code.clone()),
            Self::HookFailed(_) => Cow::Borrowed(ErrorKind::HookError.as_code()),
            Self::WorkerStopped => Cow::Borrowed(ErrorKind::WorkerStopped.as_code()),
            Self::Transport(_) => Cow::Borrowed("TRANSPORT_ERROR"),
        }
    }
}

impl From<bastion_wire::FramingError> for BridgeError {
    fn from(e: bastion_wire::FramingError) -> Self {
        Self::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hook_failed_propagates_the_plugins_own_code() {
        let err = BridgeError::HookFailed(WireError::new("SECURITY_VIOLATION", "blocked"));
        assert_eq!(err.code().as_ref(), "SECURITY_VIOLATION");
    }

    #[test]
    fn hook_failed_falls_back_to_hook_error_without_a_code() {
        let err = BridgeError::HookFailed(WireError::new("", "blocked"));
        assert_eq!(err.code().as_ref(), ErrorKind::HookError.as_code());
    }
}
