use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Config, FileConfig, MemoryEnvelopeKeys};

const ENV_PREFIX: &str = "BASTION_";

/// Load configuration: defaults, then an optional TOML file at
/// `file_path` (if it exists), then `BASTION_*` environment variables.
///
/// # Errors
///
/// Returns [`ConfigError::Io`]/[`ConfigError::Parse`] if `file_path` exists
/// but cannot be read or parsed, or [`ConfigError::Invalid`] if the merged
/// result fails validation.
pub fn load(file_path: Option<&Path>) -> ConfigResult<Config> {
    let mut config = Config::default();

    if let Some(path) = file_path {
        if path.exists() {
            apply_file(&mut config, path)?;
        }
    }

    apply_env(&mut config);
    validate(&config)?;
    Ok(config)
}

fn apply_file(config: &mut Config, path: &Path) -> ConfigResult<()> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let file: FileConfig = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    if let Some(v) = file.bind_address {
        config.bind_address = v;
    }
    if let Some(v) = file.plugin_dir {
        config.plugin_dir = v;
    }
    if let Some(v) = file.extra_plugin_paths {
        config.extra_plugin_paths = v;
    }
    if let Some(v) = file.plugin_deny_list {
        config.plugin_deny_list = v;
    }
    if let Some(v) = file.hook_timeout_ms {
        config.hook_timeout_ms = v;
    }
    if let Some(v) = file.syscall_timeout_ms {
        config.syscall_timeout_ms = v;
    }
    if let Some(v) = file.sandbox_ready_timeout_ms {
        config.sandbox_ready_timeout_ms = v;
    }
    if let Some(v) = file.rate_limit_window_secs {
        config.rate_limit_window_secs = v;
    }
    if let Some(v) = file.rate_limit_budget {
        config.rate_limit_budget = v;
    }
    if let Some(raw_key) = file.memory_encryption_key {
        config.memory_envelope.encryption_key = decode_key(&raw_key);
    }
    if let Some(raw_key) = file.memory_signing_key {
        config.memory_envelope.signing_key = decode_key(&raw_key);
    }

    Ok(())
}

fn apply_env(config: &mut Config) {
    if let Ok(v) = std::env::var(format!("{ENV_PREFIX}BIND_ADDRESS")) {
        config.bind_address = v;
    }
    if let Ok(v) = std::env::var(format!("{ENV_PREFIX}PLUGIN_DIR")) {
        config.plugin_dir = v;
    }
    if let Ok(v) = std::env::var(format!("{ENV_PREFIX}HOOK_TIMEOUT_MS")) {
        if let Ok(parsed) = v.parse() {
            config.hook_timeout_ms = parsed;
        }
    }
    if let Ok(v) = std::env::var(format!("{ENV_PREFIX}SYSCALL_TIMEOUT_MS")) {
        if let Ok(parsed) = v.parse() {
            config.syscall_timeout_ms = parsed;
        }
    }
    if let Ok(v) = std::env::var(format!("{ENV_PREFIX}SANDBOX_READY_TIMEOUT_MS")) {
        if let Ok(parsed) = v.parse() {
            config.sandbox_ready_timeout_ms = parsed;
        }
    }
    if let Ok(v) = std::env::var(format!("{ENV_PREFIX}RATE_LIMIT_WINDOW_SECS")) {
        if let Ok(parsed) = v.parse() {
            config.rate_limit_window_secs = parsed;
        }
    }
    if let Ok(v) = std::env::var(format!("{ENV_PREFIX}RATE_LIMIT_BUDGET")) {
        if let Ok(parsed) = v.parse() {
            config.rate_limit_budget = parsed;
        }
    }
    if let Ok(v) = std::env::var(format!("{ENV_PREFIX}MEMORY_ENCRYPTION_KEY")) {
        config.memory_envelope.encryption_key = decode_key(&v);
    }
    if let Ok(v) = std::env::var(format!("{ENV_PREFIX}MEMORY_SIGNING_KEY")) {
        config.memory_envelope.signing_key = decode_key(&v);
    }
}

/// Decode a 32-byte key given as hex or base64 (§6: "hex or base64").
/// Tries hex first (fixed-width, unambiguous for 64 hex chars), then base64.
fn decode_key(raw: &str) -> Option<[u8; 32]> {
    use base64::Engine as _;

    let bytes = hex::decode(raw)
        .ok()
        .or_else(|| base64::engine::general_purpose::STANDARD.decode(raw).ok())?;
    bytes.try_into().ok()
}

fn validate(config: &Config) -> ConfigResult<()> {
    let mut errors = Vec::new();

    if config.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(format!(
            "bind_address {:?} is not a valid socket address",
            config.bind_address
        ));
    }
    if config.plugin_dir.trim().is_empty() {
        errors.push("plugin_dir must not be empty".to_string());
    }
    if config.hook_timeout_ms == 0 {
        errors.push("hook_timeout_ms must be greater than zero".to_string());
    }
    if config.syscall_timeout_ms == 0 {
        errors.push("syscall_timeout_ms must be greater than zero".to_string());
    }
    if config.sandbox_ready_timeout_ms == 0 {
        errors.push("sandbox_ready_timeout_ms must be greater than zero".to_string());
    }
    if config.rate_limit_window_secs == 0 {
        errors.push("rate_limit_window_secs must be greater than zero".to_string());
    }
    if config.rate_limit_budget == 0 {
        errors.push("rate_limit_budget must be greater than zero".to_string());
    }
    if config.memory_envelope.encryption_key.is_none() && config.memory_envelope.signing_key.is_some() {
        errors.push(
            "memory_signing_key configured without memory_encryption_key".to_string(),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_validate() {
        let config = Config::default();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn rejects_empty_plugin_dir() {
        let mut config = Config::default();
        config.plugin_dir = String::new();
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn aggregates_multiple_errors() {
        let mut config = Config::default();
        config.plugin_dir = String::new();
        config.hook_timeout_ms = 0;
        match validate(&config) {
            Err(ConfigError::Invalid(errs)) => assert_eq!(errs.len(), 2),
            other => panic!("expected aggregated Invalid, got {other:?}"),
        }
    }

    #[test]
    fn loads_from_file_and_env_with_env_winning() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"bind_address = "127.0.0.1:9000""#).unwrap();
        writeln!(file, r#"plugin_dir = "/tmp/plugins""#).unwrap();

        // SAFETY: single-threaded test, no concurrent env access.
        std::env::set_var("BASTION_PLUGIN_DIR", "/tmp/from-env");
        let config = load(Some(file.path())).unwrap();
        std::env::remove_var("BASTION_PLUGIN_DIR");

        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.plugin_dir, "/tmp/from-env");
    }

    #[test]
    fn decodes_hex_key() {
        let hex_key = "00".repeat(32);
        let decoded = decode_key(&hex_key).unwrap();
        assert_eq!(decoded, [0u8; 32]);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load(Some(Path::new("/nonexistent/bastion.toml"))).unwrap();
        assert_eq!(config.bind_address, Config::default().bind_address);
    }

    #[test]
    fn envelope_keys_default_empty() {
        let keys = MemoryEnvelopeKeys::default();
        assert!(keys.encryption_key.is_none());
        assert!(keys.signing_key.is_none());
    }
}
