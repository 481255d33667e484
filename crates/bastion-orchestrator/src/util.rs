use bastion_core::PluginId;

use crate::error::OrchestratorError;

/// Split a namespaced `pluginId__localName` name into its parts (§4.8
/// `executeTool`/`executeSkill`: "split on first `__`").
pub(crate) fn split_namespaced(full_name: &str) -> Result<(PluginId, String), OrchestratorError> {
    let (plugin_part, local_part) = full_name
        .split_once("__")
        .ok_or_else(|| OrchestratorError::MalformedFullName(full_name.to_string()))?;

    let plugin_id = PluginId::parse(plugin_part)
        .map_err(|_| OrchestratorError::MalformedFullName(full_name.to_string()))?;

    Ok((plugin_id, local_part.to_string()))
}
