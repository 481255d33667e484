use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bastion_core::now_millis;

/// The message kind carried by an [`Envelope`] (§3, §6 "RPC wire format").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnvelopeKind {
    /// Host → sandbox: invoke a named hook.
    HookCall,
    /// Sandbox → host: invoke a named syscall.
    SysCall,
    /// Either direction: a successful response to a prior envelope id.
    ResponseOk,
    /// Either direction: a failed response to a prior envelope id.
    ResponseErr,
    /// Sandbox → host: the sandbox has finished booting.
    SandboxReady,
    /// Host → sandbox: initialize the plugin with its runtime context.
    Init,
}

/// A stable, cross-boundary error shape.
///
/// Only `code` and `message` ever cross the trust boundary; `stack` is
/// populated only in development builds and is stripped by the bridge
/// before forwarding to the other side (§4.1, §7, §9 "stack-trace
/// leakage").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireError {
    /// A stable error code, e.g. `PERMISSION_DENIED`.
    pub code: String,
    /// A human-readable message.
    pub message: String,
    /// Development-only stack text; must be `None` once forwarded across
    /// the boundary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl WireError {
    /// Build a wire error with no stack text attached.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            stack: None,
        }
    }

    /// Strip the `stack` field, as required before forwarding across the
    /// trust boundary.
    #[must_use]
    pub fn redacted(mut self) -> Self {
        self.stack = None;
        self
    }
}

/// A framed message crossing the host/sandbox boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// 128-bit random id. Responses echo the id of the request they answer.
    pub id: Uuid,
    /// Creation timestamp in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// The message kind.
    #[serde(rename = "type")]
    pub kind: EnvelopeKind,
    /// The method name, present on `HOOK_CALL`/`SYS_CALL`/`INIT`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// The opaque request/ready payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// The opaque success result, present on `RESPONSE_OK`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// The error shape, present on `RESPONSE_ERR`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
}

/// Errors raised while constructing or validating an envelope.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EnvelopeError {
    /// A `HOOK_CALL`/`SYS_CALL`/`INIT` envelope was built without a method.
    #[error("envelope of kind {0:?} requires a method name")]
    MissingMethod(EnvelopeKind),
}

impl Envelope {
    /// Build a new request envelope with a fresh random id and the current
    /// timestamp.
    fn new_request(
        kind: EnvelopeKind,
        method: impl Into<String>,
        payload: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: now_millis(),
            kind,
            method: Some(method.into()),
            payload,
            result: None,
            error: None,
        }
    }

    /// Build a `HOOK_CALL` envelope (host → sandbox).
    #[must_use]
    pub fn hook_call(method: impl Into<String>, payload: serde_json::Value) -> Self {
        Self::new_request(EnvelopeKind::HookCall, method, Some(payload))
    }

    /// Build a `SYS_CALL` envelope (sandbox → host).
    #[must_use]
    pub fn sys_call(method: impl Into<String>, payload: serde_json::Value) -> Self {
        Self::new_request(EnvelopeKind::SysCall, method, Some(payload))
    }

    /// Build an `INIT` envelope (host → sandbox).
    #[must_use]
    pub fn init(payload: serde_json::Value) -> Self {
        Self::new_request(EnvelopeKind::Init, "init", Some(payload))
    }

    /// Build a `SANDBOX_READY` envelope (sandbox → host).
    #[must_use]
    pub fn sandbox_ready() -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: now_millis(),
            kind: EnvelopeKind::SandboxReady,
            method: None,
            payload: None,
            result: None,
            error: None,
        }
    }

    /// Build a `RESPONSE_OK` envelope answering `request_id`.
    #[must_use]
    pub fn response_ok(request_id: Uuid, result: serde_json::Value) -> Self {
        Self {
            id: request_id,
            timestamp: now_millis(),
            kind: EnvelopeKind::ResponseOk,
            method: None,
            payload: None,
            result: Some(result),
            error: None,
        }
    }

    /// Build a `RESPONSE_ERR` envelope answering `request_id`. The error's
    /// stack text is redacted unconditionally.
    #[must_use]
    pub fn response_err(request_id: Uuid, error: WireError) -> Self {
        Self {
            id: request_id,
            timestamp: now_millis(),
            kind: EnvelopeKind::ResponseErr,
            method: None,
            payload: None,
            result: None,
            error: Some(error.redacted()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hook_call_carries_method_and_payload() {
        let env = Envelope::hook_call("onPromptReceived", serde_json::json!({"prompt": "hi"}));
        assert_eq!(env.kind, EnvelopeKind::HookCall);
        assert_eq!(env.method.as_deref(), Some("onPromptReceived"));
        assert!(env.payload.is_some());
    }

    #[test]
    fn response_err_always_redacts_stack() {
        let err = WireError {
            code: "HOOK_ERROR".to_string(),
            message: "boom".to_string(),
            stack: Some("at foo.js:1:1".to_string()),
        };
        let env = Envelope::response_err(Uuid::new_v4(), err);
        assert!(env.error.unwrap().stack.is_none());
    }

    #[test]
    fn response_echoes_request_id() {
        let req = Envelope::sys_call("db.query", serde_json::json!({}));
        let resp = Envelope::response_ok(req.id, serde_json::json!({"rows": []}));
        assert_eq!(req.id, resp.id);
    }

    #[test]
    fn ids_never_collide_across_many_envelopes() {
        let mut ids = std::collections::HashSet::new();
        for _ in 0..10_000 {
            let env = Envelope::hook_call("ping", serde_json::json!(null));
            assert!(ids.insert(env.id));
        }
    }

    #[test]
    fn serde_roundtrip_preserves_shape() {
        let env = Envelope::sys_call("memory.get", serde_json::json!({"key": "k"}));
        let json = serde_json::to_string(&env).unwrap();
        let parsed: Envelope = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, env.id);
        assert_eq!(parsed.kind, env.kind);
        assert_eq!(parsed.method, env.method);
    }

    #[test]
    fn wire_type_field_uses_screaming_snake_case() {
        let env = Envelope::sandbox_ready();
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["type"], "SANDBOX_READY");
    }
}
