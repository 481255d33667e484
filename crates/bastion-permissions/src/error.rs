use bastion_core::PluginId;

/// Raised by every failing guard check. Carries the plugin id, the
/// permission path that was checked (e.g. `"db.tables"`, `"network"`), and
/// a human-readable description of the attempted action (§4.3).
#[derive(Debug, Clone, thiserror::Error)]
#[error("permission denied for plugin {plugin_id}: {permission_path} ({action})")]
pub struct PermissionError {
    /// The plugin that attempted the action.
    pub plugin_id: PluginId,
    /// The permission family/sub-path that was checked.
    pub permission_path: String,
    /// A human-readable description of the denied action.
    pub action: String,
}

impl PermissionError {
    /// Construct a new permission error.
    pub fn new(
        plugin_id: PluginId,
        permission_path: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            plugin_id,
            permission_path: permission_path.into(),
            action: action.into(),
        }
    }

    /// The stable error code for this error (`PERMISSION_DENIED`, §7).
    #[must_use]
    pub fn code(&self) -> &'static str {
        bastion_core::ErrorKind::PermissionDenied.as_code()
    }
}
