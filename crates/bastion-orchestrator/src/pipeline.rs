use bastion_core::PluginId;
use serde_json::Value;

use crate::error::OrchestratorError;

/// Outcome of a pipeline phase that may both transform its input and
/// short-circuit the request (`processPrompt`, `beforeLLMCall`, §4.8).
#[derive(Debug)]
pub enum PipelineOutcome<T> {
    /// No plugin intercepted; carries the (possibly transformed) value.
    Continued(T),
    /// A plugin returned the `{__intercept:true, result}` envelope; the
    /// pipeline stops and `result` becomes the request's reply.
    Intercepted {
        /// The plugin's supplied reply.
        result: Value,
        /// The plugin that intercepted.
        plugin_id: PluginId,
    },
    /// A plugin's hook call raised or timed out; the pipeline aborts.
    Failed(OrchestratorError),
}

/// Recognize the `{__intercept:true, result}` envelope (§4.8
/// `processPrompt`/`beforeLLMCall`).
pub(crate) fn as_intercept_envelope(value: &Value) -> Option<Value> {
    let object = value.as_object()?;
    if object.get("__intercept").and_then(Value::as_bool) != Some(true) {
        return None;
    }
    Some(object.get("result").cloned().unwrap_or(Value::Null))
}
