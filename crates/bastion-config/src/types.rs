use serde::Deserialize;

/// Optional AEAD/HMAC keys configuring the memory service's secure envelope
/// (§4.4, §6 "Environment"). Absent keys mean the secure envelope is
/// disabled and the underlying backend is used unwrapped.
#[derive(Debug, Clone, Default)]
pub struct MemoryEnvelopeKeys {
    /// 32-byte AES-256-GCM encryption key.
    pub encryption_key: Option<[u8; 32]>,
    /// Optional separate HMAC-SHA256 signing key; defaults to the
    /// encryption key when absent.
    pub signing_key: Option<[u8; 32]>,
}

/// Resolved process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP bind address for the chat server, e.g. `0.0.0.0:8080`.
    pub bind_address: String,
    /// Directory scanned for plugin candidates (§4.6).
    pub plugin_dir: String,
    /// Additional directories scanned alongside `plugin_dir`.
    pub extra_plugin_paths: Vec<String>,
    /// Plugin ids excluded from loading regardless of their manifest.
    pub plugin_deny_list: Vec<String>,
    /// Default hook call timeout in milliseconds (§5: default 5 s).
    pub hook_timeout_ms: u64,
    /// Default syscall timeout in milliseconds (§5: default 30 s).
    pub syscall_timeout_ms: u64,
    /// `SANDBOX_READY` wait timeout in milliseconds (§5: default 5 s).
    pub sandbox_ready_timeout_ms: u64,
    /// Sliding rate-limit window in seconds (§3: default 60 s).
    pub rate_limit_window_secs: u64,
    /// Sliding rate-limit call budget per window (§3: default 300).
    pub rate_limit_budget: u32,
    /// Memory envelope keys, if the secure envelope is enabled.
    pub memory_envelope: MemoryEnvelopeKeys,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            plugin_dir: "./plugins".to_string(),
            extra_plugin_paths: Vec::new(),
            plugin_deny_list: Vec::new(),
            hook_timeout_ms: 5_000,
            syscall_timeout_ms: 30_000,
            sandbox_ready_timeout_ms: 5_000,
            rate_limit_window_secs: 60,
            rate_limit_budget: 300,
            memory_envelope: MemoryEnvelopeKeys::default(),
        }
    }
}

/// Raw TOML file shape; every field optional so the file may set only a
/// subset of knobs.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct FileConfig {
    pub bind_address: Option<String>,
    pub plugin_dir: Option<String>,
    pub extra_plugin_paths: Option<Vec<String>>,
    pub plugin_deny_list: Option<Vec<String>>,
    pub hook_timeout_ms: Option<u64>,
    pub syscall_timeout_ms: Option<u64>,
    pub sandbox_ready_timeout_ms: Option<u64>,
    pub rate_limit_window_secs: Option<u64>,
    pub rate_limit_budget: Option<u32>,
    pub memory_encryption_key: Option<String>,
    pub memory_signing_key: Option<String>,
}
