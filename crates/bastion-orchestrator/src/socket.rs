//! Socket connect/disconnect/message pipelines (§4.8).

use serde_json::{json, Value};
use tracing::warn;

use bastion_permissions::PermissionGuard;

use crate::error::OrchestratorError;
use crate::pipeline::{as_intercept_envelope, PipelineOutcome};
use crate::registry::Orchestrator;

impl Orchestrator {
    /// Fan out `onSocketConnect` to every plugin holding `socket.can_emit`.
    /// Best-effort: a failing plugin is logged and does not stop the
    /// others.
    pub async fn socket_connect(&self, session_id: &str) {
        self.fan_out_socket_event("onSocketConnect", json!({ "sessionId": session_id })).await;
    }

    /// Fan out `onSocketDisconnect` to every plugin holding `socket.can_emit`.
    pub async fn socket_disconnect(&self, session_id: &str) {
        self.fan_out_socket_event("onSocketDisconnect", json!({ "sessionId": session_id })).await;
    }

    async fn fan_out_socket_event(&self, hook: &str, payload: Value) {
        for (plugin, bridge) in self.iter_with_bridge() {
            let guard = PermissionGuard::new(plugin.manifest.id.clone(), &plugin.manifest.permissions);
            if !guard.can_emit_socket() {
                continue;
            }
            if let Err(e) = bridge.call_hook(hook, payload.clone()).await {
                warn!(plugin_id = %plugin.manifest.id, hook, error = %e, "socket fan-out hook failed");
            }
        }
    }

    /// `onSocketMessage` (§4.8): interception-style, filtered by each
    /// plugin's `socket.can_intercept` flag and its declared `socket.events`
    /// list (wildcard allowed).
    pub async fn socket_message(&self, session_id: &str, event: &str, payload: Value) -> PipelineOutcome<Value> {
        let mut current = payload;

        for (plugin, bridge) in self.iter_with_bridge() {
            let guard = PermissionGuard::new(plugin.manifest.id.clone(), &plugin.manifest.permissions);
            if guard.check_socket_event(event).is_err() {
                continue;
            }

            let call_payload = json!({ "sessionId": session_id, "event": event, "payload": current });
            match bridge.call_hook("onSocketMessage", call_payload).await {
                Ok(Value::Null) => {}
                Ok(value) => {
                    if let Some(result) = as_intercept_envelope(&value) {
                        return PipelineOutcome::Intercepted {
                            result,
                            plugin_id: plugin.manifest.id.clone(),
                        };
                    }
                    current = value;
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
}
