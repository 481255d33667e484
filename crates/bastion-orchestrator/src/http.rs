//! `routeHTTPRequest` (§4.8, §6 "Plugin HTTP routes").

use std::collections::HashMap;

use bastion_permissions::PermissionGuard;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use bastion_core::PluginId;

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::registry::Orchestrator;

/// Default security headers applied to every plugin HTTP response (§4.8),
/// unless the plugin already supplied a header of the same name.
const DEFAULT_SECURITY_HEADERS: &[(&str, &str)] = &[
    (
        "content-security-policy",
        "default-src 'none'; frame-ancestors 'none'; base-uri 'none'; form-action 'none'",
    ),
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("referrer-policy", "no-referrer"),
];

/// A request forwarded to a plugin's `onHTTPRequest` hook, after stripping
/// the `/api/v1/p/{pluginId}` mount prefix.
#[derive(Debug, Clone, Serialize)]
pub struct PluginHttpRequest {
    /// HTTP method.
    pub method: String,
    /// Sub-path with the mount prefix already stripped.
    pub path: String,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// The parsed request body, if any.
    pub body: Value,
}

/// A plugin's `onHTTPRequest` response, before security headers are
/// applied.
#[derive(Debug, Clone, Deserialize)]
pub struct PluginHttpResponse {
    /// HTTP status code.
    #[serde(default = "default_status")]
    pub status: u16,
    /// Response headers as declared by the plugin.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Response body.
    #[serde(default)]
    pub body: Value,
}

fn default_status() -> u16 {
    200
}

impl Orchestrator {
    /// `routeHTTPRequest(pluginId, request)` (§4.8): resolve the manifest,
    /// check the `api` route grant, call `onHTTPRequest`, and augment the
    /// response with the default security headers unless the plugin
    /// supplied its own header of the same name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::PluginNotFound`] if `plugin_id` is not
    /// loaded, [`OrchestratorError::Permission`] if the route grant does
    /// not cover this method/path, or [`OrchestratorError::HookFailed`] if
    /// the hook call raises or times out.
    pub async fn route_http_request(
        &self,
        plugin_id: &PluginId,
        request: PluginHttpRequest,
    ) -> OrchestratorResult<PluginHttpResponse> {
        let plugin = self
            .manifest(plugin_id)
            .ok_or_else(|| OrchestratorError::PluginNotFound(plugin_id.clone()))?;

        let guard = PermissionGuard::new(plugin_id.clone(), &plugin.manifest.permissions);
        guard.check_api_route(&request.method, &request.path)?;

        let bridge = self
            .bridge(plugin_id)
            .ok_or_else(|| OrchestratorError::PluginNotFound(plugin_id.clone()))?;

        let raw = bridge
            .call_hook("onHTTPRequest", serde_json::to_value(&request).unwrap_or(Value::Null))
            .await
            .map_err(|source| OrchestratorError::HookFailed {
                plugin_id: plugin_id.clone(),
                source,
            })?;

        let mut response: PluginHttpResponse = serde_json::from_value(raw).unwrap_or(PluginHttpResponse {
            status: default_status(),
            headers: HashMap::new(),
            body: Value::Null,
        });

        let existing: std::collections::HashSet<String> =
            response.headers.keys().map(|k| k.to_ascii_lowercase()).collect();
        for (name, value) in DEFAULT_SECURITY_HEADERS {
            if !existing.contains(*name) {
                response.headers.insert((*name).to_string(), (*value).to_string());
            }
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugin_supplied_header_wins_over_default() {
        let mut response = PluginHttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Value::Null,
        };
        response
            .headers
            .insert("X-Frame-Options".to_string(), "SAMEORIGIN".to_string());

        let existing: std::collections::HashSet<String> =
            response.headers.keys().map(|k| k.to_ascii_lowercase()).collect();
        for (name, value) in DEFAULT_SECURITY_HEADERS {
            if !existing.contains(*name) {
                response.headers.insert((*name).to_string(), (*value).to_string());
            }
        }

        assert_eq!(response.headers.get("X-Frame-Options").unwrap(), "SAMEORIGIN");
        assert_eq!(response.headers.get("x-content-type-options").unwrap(), "nosniff");
    }
}
