//! `collectSkills`/`executeSkill` (§4.8), and the [`SkillInvoker`] seam that
//! lets `skills.invoke` syscalls re-enter this same pipeline.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use bastion_core::PluginId;
use bastion_permissions::PermissionGuard;
use bastion_syscall::SkillInvoker;

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::registry::Orchestrator;
use crate::util::split_namespaced;

#[derive(Debug, Deserialize)]
struct RawSkill {
    name: String,
    #[serde(default)]
    description: Option<String>,
}

/// A skill advertised by a plugin, namespaced for cross-plugin reference.
#[derive(Debug, Clone)]
pub struct NamespacedSkill {
    /// `pluginId__localName`.
    pub full_name: String,
    /// Optional human-readable description.
    pub description: Option<String>,
}

impl Orchestrator {
    /// `collectSkills()` (§4.8): like [`Self::collect_tools`], but a
    /// plugin's own `skills` grant additionally gates which of its declared
    /// skills are exposed — a plugin may only advertise a skill it is
    /// itself permitted to invoke under its own namespace.
    pub async fn collect_skills(&self) -> Vec<NamespacedSkill> {
        let mut skills = Vec::new();

        for (plugin, bridge) in self.iter_with_bridge() {
            let raw = match bridge.call_hook("getSkills", Value::Null).await {
                Ok(Value::Null) => continue,
                Ok(value) => value,
                Err(e) => {
                    warn!(plugin_id = %plugin.manifest.id, error = %e, "getSkills failed, skipping plugin");
                    continue;
                }
            };

            let Some(entries) = raw.as_array() else {
                warn!(plugin_id = %plugin.manifest.id, "getSkills did not return an array, skipping plugin");
                continue;
            };

            let guard = PermissionGuard::new(plugin.manifest.id.clone(), &plugin.manifest.permissions);

            for entry in entries {
                let raw_skill: RawSkill = match serde_json::from_value(entry.clone()) {
                    Ok(s) => s,
                    Err(e) => {
                        warn!(plugin_id = %plugin.manifest.id, error = %e, "malformed skill definition, skipping entry");
                        continue;
                    }
                };

                let full_name = format!("{}__{}", plugin.manifest.id, raw_skill.name);
                if guard.check_skill(&full_name).is_err() {
                    debug!(plugin_id = %plugin.manifest.id, skill = %full_name, "skill not self-granted, not advertised");
                    continue;
                }

                skills.push(NamespacedSkill {
                    full_name,
                    description: raw_skill.description,
                });
            }
        }

        skills
    }

    /// `executeSkill(fullName, args)` (§4.8): split, guard-check the local
    /// name against the owning plugin's own `skills` grant, call
    /// `executeSkill`, return its result.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::MalformedFullName`] or
    /// [`OrchestratorError::PluginNotFound`] as in [`Self::execute_tool`],
    /// [`OrchestratorError::Permission`] if the owning plugin has not
    /// self-granted `full_name`, or [`OrchestratorError::HookFailed`] if the
    /// call raises or times out.
    pub async fn execute_skill(&self, full_name: &str, args: Value) -> OrchestratorResult<Value> {
        let (plugin_id, local_name) = split_namespaced(full_name)?;
        let plugin = self
            .manifest(&plugin_id)
            .ok_or_else(|| OrchestratorError::PluginNotFound(plugin_id.clone()))?;

        let guard = PermissionGuard::new(plugin_id.clone(), &plugin.manifest.permissions);
        guard.check_skill(full_name)?;

        let bridge = self
            .bridge(&plugin_id)
            .ok_or_else(|| OrchestratorError::PluginNotFound(plugin_id.clone()))?;

        bridge
            .call_hook("executeSkill", serde_json::json!({ "name": local_name, "args": args }))
            .await
            .map_err(|source| OrchestratorError::HookFailed { plugin_id, source })
    }
}

#[async_trait]
impl SkillInvoker for Orchestrator {
    async fn invoke(&self, _caller: &PluginId, full_name: &str, args: Value) -> Result<Value, String> {
        self.execute_skill(full_name, args).await.map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_skill_deserializes_without_description() {
        let raw: RawSkill = serde_json::from_value(serde_json::json!({"name": "search"})).unwrap();
        assert_eq!(raw.name, "search");
        assert!(raw.description.is_none());
    }
}
