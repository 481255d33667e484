use std::borrow::Cow;

use bastion_bridge::BridgeError;
use bastion_core::PluginId;
use bastion_permissions::PermissionError;

/// Errors raised while composing or running a pipeline (§4.8).
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// A guard check rejected the call before it reached a bridge.
    #[error(transparent)]
    Permission(#[from] PermissionError),
    /// A plugin's hook call raised or timed out.
    #[error("hook call to plugin {plugin_id} failed: {source}")]
    HookFailed {
        /// The plugin whose hook call failed.
        plugin_id: PluginId,
        /// The underlying bridge error.
        #[source]
        source: BridgeError,
    },
    /// A namespaced name (`pluginId__localName`) did not resolve to a
    /// registered plugin.
    #[error("plugin {0} has no bridge registered")]
    PluginNotFound(PluginId),
    /// A namespaced name could not be split into plugin id and local name.
    #[error("malformed namespaced name {0:?}: expected 'pluginId__localName'")]
    MalformedFullName(String),
}

impl OrchestratorError {
    /// The stable wire error code for this error (§7). `HookFailed`
    /// forwards the bridge error's code, which in turn forwards whatever
    /// code the plugin's own hook raised.
    #[must_use]
    pub fn code(&self) -> Cow<'static, str> {
        match self {
            Self::Permission(e) => Cow::Borrowed(e.code()),
            Self::HookFailed { source, .. } => source.code(),
            Self::PluginNotFound(_) => Cow::Borrowed("PLUGIN_NOT_FOUND"),
            Self::MalformedFullName(_) => Cow::Borrowed("MALFORMED_NAME"),
        }
    }

    /// The plugin that is responsible for this error, when one applies
    /// (§6 `blockedBy`): the plugin whose hook call failed, or whose
    /// permission guard rejected the request.
    #[must_use]
    pub fn blocked_by(&self) -> Option<PluginId> {
        match self {
            Self::Permission(e) => Some(e.plugin_id.clone()),
            Self::HookFailed { plugin_id, .. } => Some(plugin_id.clone()),
            Self::PluginNotFound(_) | Self::MalformedFullName(_) => None,
        }
    }
}

/// Result alias for orchestrator operations.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
