//! `search(options)` (§4.8).

use serde_json::Value;
use tracing::warn;

use crate::registry::Orchestrator;

impl Orchestrator {
    /// Invoke `onSearch` in priority order; return the first non-empty
    /// array a plugin responds with. A plugin whose call fails or returns
    /// an empty/unrecognized result is skipped in favor of the next one.
    pub async fn search(&self, options: Value) -> Vec<Value> {
        for (plugin, bridge) in self.iter_with_bridge() {
            match bridge.call_hook("onSearch", options.clone()).await {
                Ok(Value::Array(items)) if !items.is_empty() => return items,
                Ok(_) => {}
                Err(e) => {
                    warn!(plugin_id = %plugin.manifest.id, error = %e, "onSearch failed, trying next plugin");
                }
            }
        }

        Vec::new()
    }
}
