//! The tool-executor callback handed to the LLM driver (§4.8).

use serde_json::Value;

use crate::error::OrchestratorResult;
use crate::registry::Orchestrator;

/// Outcome of invoking a namespaced tool or skill call requested by the
/// model.
#[derive(Debug)]
pub enum ToolInvocationOutcome {
    /// A normal result to hand back to the model as the tool's output.
    Handoff(Value),
    /// The `{__frontclaw:{mode:"end_request", response}}` control envelope:
    /// the request terminates immediately with `response` as the final
    /// assistant reply.
    EndRequest(String),
}

impl Orchestrator {
    /// On invocation, first try skills (`executeSkill`); if the skill
    /// result reports `success`, use its payload. Otherwise fall back to
    /// tools (`executeTool`). Either branch may return the `end_request`
    /// control envelope (§4.8 "Tool-executor callback").
    ///
    /// # Errors
    ///
    /// Returns whatever [`Self::execute_tool`] returns if both the skill
    /// attempt and the tool fallback fail.
    pub async fn invoke_tool_or_skill(&self, full_name: &str, args: Value) -> OrchestratorResult<ToolInvocationOutcome> {
        let raw = match self.execute_skill(full_name, args.clone()).await {
            Ok(value) if reports_success(&value) => value,
            _ => self.execute_tool(full_name, args).await?,
        };

        Ok(interpret_control_envelope(raw))
    }
}

fn reports_success(value: &Value) -> bool {
    value.get("success").and_then(Value::as_bool) == Some(true)
}

fn interpret_control_envelope(value: Value) -> ToolInvocationOutcome {
    let Some(envelope) = value.get("__frontclaw").and_then(Value::as_object) else {
        return ToolInvocationOutcome::Handoff(value);
    };

    if envelope.get("mode").and_then(Value::as_str) != Some("end_request") {
        return ToolInvocationOutcome::Handoff(value);
    }

    let response = envelope
        .get("response")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    ToolInvocationOutcome::EndRequest(response)
}
