//! `collectTools`/`executeTool` (§4.8).

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use bastion_llm::LlmToolDefinition;

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::registry::Orchestrator;
use crate::util::split_namespaced;

#[derive(Debug, Deserialize)]
struct RawTool {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "inputSchema", default)]
    input_schema: Value,
}

impl Orchestrator {
    /// `collectTools()` (§4.8): call `getTools` on every bridge; namespace
    /// each returned tool as `pluginId__localName`. A plugin whose
    /// `getTools` call fails or returns an unrecognized shape is logged and
    /// skipped — collection never fails outright for one bad plugin.
    pub async fn collect_tools(&self) -> Vec<LlmToolDefinition> {
        let mut tools = Vec::new();

        for (plugin, bridge) in self.iter_with_bridge() {
            let raw = match bridge.call_hook("getTools", Value::Null).await {
                Ok(Value::Null) => continue,
                Ok(value) => value,
                Err(e) => {
                    warn!(plugin_id = %plugin.manifest.id, error = %e, "getTools failed, skipping plugin");
                    continue;
                }
            };

            let Some(entries) = raw.as_array() else {
                warn!(plugin_id = %plugin.manifest.id, "getTools did not return an array, skipping plugin");
                continue;
            };

            for entry in entries {
                match serde_json::from_value::<RawTool>(entry.clone()) {
                    Ok(raw_tool) => tools.push(LlmToolDefinition {
                        name: format!("{}__{}", plugin.manifest.id, raw_tool.name),
                        description: raw_tool.description,
                        input_schema: raw_tool.input_schema,
                    }),
                    Err(e) => warn!(
                        plugin_id = %plugin.manifest.id,
                        error = %e,
                        "malformed tool definition, skipping entry"
                    ),
                }
            }
        }

        tools
    }

    /// `executeTool(fullName, args)` (§4.8): split on first `__`, look up
    /// the bridge, call `executeTool` with the local name, surface its raw
    /// `{success, result|error}` shape.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::MalformedFullName`] if `full_name` does
    /// not contain a `__` separator or the plugin part is not a valid
    /// [`bastion_core::PluginId`], [`OrchestratorError::PluginNotFound`] if
    /// no bridge is registered for that plugin, or
    /// [`OrchestratorError::HookFailed`] if the call raises or times out.
    pub async fn execute_tool(&self, full_name: &str, args: Value) -> OrchestratorResult<Value> {
        let (plugin_id, local_name) = split_namespaced(full_name)?;
        let bridge = self
            .bridge(&plugin_id)
            .ok_or_else(|| OrchestratorError::PluginNotFound(plugin_id.clone()))?;

        bridge
            .call_hook("executeTool", serde_json::json!({ "name": local_name, "args": args }))
            .await
            .map_err(|source| OrchestratorError::HookFailed { plugin_id, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_tool_deserializes_camel_case_schema() {
        let value = serde_json::json!({
            "name": "search_web",
            "description": "search the web",
            "inputSchema": {"type": "object"},
        });
        let raw: RawTool = serde_json::from_value(value).unwrap();
        assert_eq!(raw.name, "search_web");
        assert_eq!(raw.input_schema, serde_json::json!({"type": "object"}));
    }
}
