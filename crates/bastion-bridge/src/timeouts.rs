use std::time::Duration;

/// Bounds for the three distinct waits a bridge performs (§5).
#[derive(Debug, Clone, Copy)]
pub struct BridgeTimeouts {
    /// Bounds waiting for `SANDBOX_READY` and the `INIT` response.
    pub sandbox_ready: Duration,
    /// Bounds every `callHook` round trip (default 5s).
    pub hook: Duration,
    /// Bounds servicing one sys-call before responding with a timeout error
    /// (default 30s).
    pub syscall: Duration,
}

impl BridgeTimeouts {
    /// Build timeouts from millisecond counts, as stored in process configuration.
    #[must_use]
    pub fn from_millis(sandbox_ready_ms: u64, hook_ms: u64, syscall_ms: u64) -> Self {
        Self {
            sandbox_ready: Duration::from_millis(sandbox_ready_ms),
            hook: Duration::from_millis(hook_ms),
            syscall: Duration::from_millis(syscall_ms),
        }
    }
}

impl Default for BridgeTimeouts {
    fn default() -> Self {
        Self::from_millis(5_000, 5_000, 30_000)
    }
}
