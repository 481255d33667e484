use std::fmt;

/// The cross-cutting error kinds named by the error handling design (§7).
///
/// These are the stable `code` strings that may cross the host/sandbox
/// trust boundary (alongside a `message`); they never carry a stack trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A capability check failed for a plugin's requested action.
    PermissionDenied,
    /// A hook call did not respond within its timeout.
    HookTimeout,
    /// The sandbox did not send `SANDBOX_READY` within its timeout.
    SandboxReadyTimeout,
    /// The `INIT` handshake failed or timed out.
    InitFailed,
    /// The bridge was stopped while calls were still pending.
    WorkerStopped,
    /// The per-plugin sliding-window rate limit was exceeded.
    SyscallRateLimited,
    /// A syscall method name was not recognized.
    UnknownSyscall,
    /// A secure memory envelope's HMAC did not verify.
    SignatureMismatch,
    /// A plugin hook threw an error without a stable code.
    HookError,
}

impl ErrorKind {
    /// The stable wire string for this error kind.
    #[must_use]
    pub fn as_code(self) -> &'static str {
        match self {
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::HookTimeout => "HOOK_TIMEOUT",
            Self::SandboxReadyTimeout => "SANDBOX_READY_TIMEOUT",
            Self::InitFailed => "INIT_FAILED",
            Self::WorkerStopped => "WORKER_STOPPED",
            Self::SyscallRateLimited => "SYSCALL_RATE_LIMITED",
            Self::UnknownSyscall => "UNKNOWN_SYSCALL",
            Self::SignatureMismatch => "SIGNATURE_MISMATCH",
            Self::HookError => "HOOK_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}
