use bastion_core::{ErrorKind, PluginId};
use bastion_permissions::PermissionError;

/// Errors raised while servicing a sys-call (§4.5). Every variant maps to a
/// stable `code` (§7) that may cross the host/sandbox boundary alongside a
/// message; none of these carry a stack trace.
#[derive(Debug, thiserror::Error)]
pub enum SyscallError {
    /// The plugin exceeded its rolling 60s/300-call budget.
    #[error("plugin {0} exceeded its sys-call rate limit")]
    RateLimited(PluginId),
    /// The requested method name has no dispatch entry.
    #[error("unknown syscall method {0}")]
    UnknownMethod(String),
    /// A permission check failed for the requested action.
    #[error(transparent)]
    Permission(#[from] PermissionError),
    /// The sys-call payload did not match the expected shape for its method.
    #[error("invalid payload for {method}: {reason}")]
    InvalidPayload {
        /// The method whose payload failed to parse.
        method: String,
        /// Description of what was wrong.
        reason: String,
    },
    /// The relational-store backend raised an error.
    #[error(transparent)]
    Db(#[from] bastion_db::DbError),
    /// The memory backend raised an error.
    #[error(transparent)]
    Memory(#[from] bastion_memory::MemoryError),
    /// The outbound HTTP request failed.
    #[error("network.fetch failed: {0}")]
    Network(String),
    /// Re-entering the skill pipeline failed; `message` is forwarded as-is
    /// from the skill's own thrown error (§4.5 "failure returns thrown
    /// error with the skill's message").
    #[error("{0}")]
    Skill(String),
}

impl SyscallError {
    /// The stable wire error code for this error (§7).
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::RateLimited(_) => ErrorKind::SyscallRateLimited.as_code(),
            Self::UnknownMethod(_) => ErrorKind::UnknownSyscall.as_code(),
            Self::Permission(_) => ErrorKind::PermissionDenied.as_code(),
            Self::InvalidPayload { .. } => "INVALID_PAYLOAD",
            Self::Db(_) | Self::Memory(_) | Self::Network(_) => "SYSCALL_FAILED",
            Self::Skill(_) => ErrorKind::HookError.as_code(),
        }
    }
}

/// Convenience alias for [`SyscallError`]-returning results.
pub type SyscallResult<T> = Result<T, SyscallError>;
