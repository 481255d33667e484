//! The loaded-manifest/bridge registry and the core prompt/message pipelines
//! (§4.8 `processPrompt`, `transformSystemMessage`, `beforeLLMCall`,
//! `afterLLMCall`).

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::warn;

use bastion_bridge::WorkerBridge;
use bastion_core::PluginId;
use bastion_llm::Message;
use bastion_permissions::PermissionGuard;
use bastion_plugins::LoadedPlugin;

use crate::error::OrchestratorError;
use crate::pipeline::{as_intercept_envelope, PipelineOutcome};

/// Holds every loaded manifest in priority order and the bridge backing
/// each one. Composes the pipelines described in §4.8; each iterates
/// manifests in that same priority order.
pub struct Orchestrator {
    plugins: Vec<LoadedPlugin>,
    bridges: HashMap<PluginId, Arc<WorkerBridge>>,
}

impl Orchestrator {
    /// Build an orchestrator over an already priority-sorted plugin list
    /// (as returned by [`bastion_plugins::load_plugins`]) and the bridges
    /// spawned for each.
    #[must_use]
    pub fn new(plugins: Vec<LoadedPlugin>, bridges: HashMap<PluginId, Arc<WorkerBridge>>) -> Self {
        Self { plugins, bridges }
    }

    /// Iterate `(manifest, bridge)` pairs in priority order, skipping any
    /// manifest whose bridge failed to start (§7 `SANDBOX_READY_TIMEOUT`/
    /// `INIT_FAILED`: "plugin is not registered; orchestrator start
    /// proceeds without it").
    pub(crate) fn iter_with_bridge(&self) -> impl Iterator<Item = (&LoadedPlugin, &Arc<WorkerBridge>)> {
        self.plugins
            .iter()
            .filter_map(|plugin| self.bridges.get(&plugin.manifest.id).map(|bridge| (plugin, bridge)))
    }

    /// Look up a loaded manifest by id.
    #[must_use]
    pub fn manifest(&self, id: &PluginId) -> Option<&LoadedPlugin> {
        self.plugins.iter().find(|p| &p.manifest.id == id)
    }

    /// Look up a bridge by plugin id.
    #[must_use]
    pub(crate) fn bridge(&self, id: &PluginId) -> Option<&Arc<WorkerBridge>> {
        self.bridges.get(id)
    }

    /// `processPrompt(prompt)` (§4.8): requires `llm.can_modify_prompt`.
    /// `undefined` carries `prompt` unchanged; the intercept envelope
    /// returns early; otherwise a returned string replaces `prompt`.
    pub async fn process_prompt(&self, prompt: String) -> PipelineOutcome<String> {
        let mut current = prompt;

        for (plugin, bridge) in self.iter_with_bridge() {
            let guard = PermissionGuard::new(plugin.manifest.id.clone(), &plugin.manifest.permissions);
            if !guard.can_modify_prompt() {
                continue;
            }

            match bridge
                .call_hook("onPromptReceived", json!({ "prompt": current }))
                .await
            {
                Ok(Value::Null) => {}
                Ok(value) => {
                    if let Some(result) = as_intercept_envelope(&value) {
                        return PipelineOutcome::Intercepted {
                            result,
                            plugin_id: plugin.manifest.id.clone(),
                        };
                    }
                    if let Some(replaced) = value.as_str() {
                        current = replaced.to_string();
                    }
                }
                Err(source) => {
                    return PipelineOutcome::Failed(OrchestratorError::HookFailed {
                        plugin_id: plugin.manifest.id.clone(),
                        source,
                    });
                }
            }
        }

        PipelineOutcome::Continued(current)
    }

    /// `transformSystemMessage(msg)` (§4.8): requires
    /// `llm.can_modify_system_message`. This pipeline cannot fail: errors
    /// are logged and the offending plugin is skipped.
    pub async fn transform_system_message(&self, message: String) -> String {
        let mut current = message;

        for (plugin, bridge) in self.iter_with_bridge() {
            let guard = PermissionGuard::new(plugin.manifest.id.clone(), &plugin.manifest.permissions);
            if !guard.can_modify_system_message() {
                continue;
            }

            match bridge
                .call_hook("transformSystemMessage", json!({ "message": current }))
                .await
            {
                Ok(Value::Null) => {}
                Ok(value) => {
                    if let Some(replaced) = value.as_str() {
                        current = replaced.to_string();
                    }
                }
                Err(e) => {
                    warn!(
                        plugin_id = %plugin.manifest.id,
                        error = %e,
                        "transformSystemMessage failed, skipping plugin"
                    );
                }
            }
        }

        current
    }

    /// `beforeLLMCall(messages)` (§4.8): requires `llm.can_intercept_task`.
    /// Same interception shape as [`Self::process_prompt`].
    pub async fn before_llm_call(&self, messages: Vec<Message>) -> PipelineOutcome<Vec<Message>> {
        let mut current = messages;

        for (plugin, bridge) in self.iter_with_bridge() {
            let guard = PermissionGuard::new(plugin.manifest.id.clone(), &plugin.manifest.permissions);
            if !guard.can_intercept_task() {
                continue;
            }

            let payload = json!({ "messages": current });
            match bridge.call_hook("beforeLLMCall", payload).await {
                Ok(Value::Null) => {}
                Ok(value) => {
                    if let Some(result) = as_intercept_envelope(&value) {
                        return PipelineOutcome::Intercepted {
                            result,
                            plugin_id: plugin.manifest.id.clone(),
                        };
                    }
                    match serde_json::from_value::<Vec<Message>>(value) {
                        Ok(replaced) => current = replaced,
                        Err(e) => warn!(
                            plugin_id = %plugin.manifest.id,
                            error = %e,
                            "beforeLLMCall returned an unrecognized shape, ignoring"
                        ),
                    }
                }
                Err(source) => {
                    return PipelineOutcome::Failed(OrchestratorError::HookFailed {
                        plugin_id: plugin.manifest.id.clone(),
                        source,
                    });
                }
            }
        }

        PipelineOutcome::Continued(current)
    }

    /// `afterLLMCall(response)` (§4.8): requires `llm.can_modify_response`
    /// (§9: a required gate, not an oversight). Errors are logged and
    /// skipped; this pipeline cannot fail.
    pub async fn after_llm_call(&self, response: Value) -> Value {
        let mut current = response;

        for (plugin, bridge) in self.iter_with_bridge() {
            let guard = PermissionGuard::new(plugin.manifest.id.clone(), &plugin.manifest.permissions);
            if !guard.can_modify_response() {
                continue;
            }

            match bridge
                .call_hook("afterLLMCall", json!({ "response": current }))
                .await
            {
                Ok(Value::Null) => {}
                Ok(value) => current = value,
                Err(e) => {
                    warn!(
                        plugin_id = %plugin.manifest.id,
                        error = %e,
                        "afterLLMCall failed, skipping plugin"
                    );
                }
            }
        }

        current
    }
}
