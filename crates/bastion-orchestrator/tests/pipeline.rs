//! Integration tests for the prompt and tool pipelines (§4.8), driven over
//! real [`WorkerBridge`]s connected to an in-memory duplex transport.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use bastion_bridge::{BridgeTimeouts, WorkerBridge};
use bastion_core::PluginId;
use bastion_db::InMemoryDbBackend;
use bastion_memory::InProcessStore;
use bastion_orchestrator::{Orchestrator, PipelineOutcome};
use bastion_permissions::{LlmGrant, Permissions};
use bastion_plugins::{LoadedPlugin, Manifest};
use bastion_syscall::{RateLimiter, SkillInvoker, SyscallHandler};
use bastion_wire::{read_envelope, write_envelope, Envelope, EnvelopeKind};

struct NoopSkills;

#[async_trait]
impl SkillInvoker for NoopSkills {
    async fn invoke(&self, _caller: &PluginId, _full_name: &str, _args: Value) -> Result<Value, String> {
        Ok(Value::Null)
    }
}

fn syscall_handler() -> Arc<SyscallHandler> {
    Arc::new(SyscallHandler::new(
        Arc::new(RateLimiter::with_limits(60, 300)),
        Arc::new(InMemoryDbBackend::new()),
        Arc::new(InProcessStore::new()),
        reqwest::Client::new(),
        Arc::new(NoopSkills),
    ))
}

fn manifest(id: &str, permissions: Permissions) -> Manifest {
    Manifest {
        id: PluginId::parse(id).unwrap(),
        name: id.to_string(),
        version: "1.0.0".to_string(),
        main: "index.js".to_string(),
        permissions,
        description: None,
        author: None,
        priority: 100,
        config_schema: None,
        default_config: Value::Null,
        min_frontclaw_version: None,
        tags: Vec::new(),
        enabled: true,
    }
}

fn loaded(manifest: Manifest) -> LoadedPlugin {
    LoadedPlugin {
        plugin_dir: std::path::PathBuf::from("/plugins").join(manifest.id.as_ref()),
        entry_path: std::path::PathBuf::from("/plugins").join(manifest.id.as_ref()).join("index.js"),
        config: Value::Null,
        manifest,
    }
}

/// Spawn a bridge over a duplex pair plus a background task that completes
/// the handshake and then answers every subsequent hook call with
/// `responder(method, payload) -> response_value`.
async fn connected_bridge<F>(id: &str, responder: F) -> Arc<WorkerBridge>
where
    F: Fn(&str, Value) -> Value + Send + 'static,
{
    let (client, server) = tokio::io::duplex(8192);
    let (client_r, client_w) = tokio::io::split(client);
    let (mut server_r, mut server_w) = tokio::io::split(server);

    tokio::spawn(async move {
        write_envelope(&mut server_w, &Envelope::sandbox_ready()).await.unwrap();
        let init = read_envelope(&mut server_r).await.unwrap();
        write_envelope(&mut server_w, &Envelope::response_ok(init.id, Value::Null))
            .await
            .unwrap();

        loop {
            let Ok(call) = read_envelope(&mut server_r).await else {
                break;
            };
            if call.kind != EnvelopeKind::HookCall {
                break;
            }
            let method = call.method.clone().unwrap_or_default();
            let payload = call.payload.clone().unwrap_or(Value::Null);
            let result = responder(&method, payload);
            if write_envelope(&mut server_w, &Envelope::response_ok(call.id, result))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    let bridge = WorkerBridge::connect(
        PluginId::parse(id).unwrap(),
        Value::Null,
        client_r,
        client_w,
        syscall_handler(),
        Arc::new(Permissions::default()),
        BridgeTimeouts::default(),
    )
    .await
    .unwrap();

    Arc::new(bridge)
}

#[tokio::test]
async fn process_prompt_continues_through_non_intercepting_plugins() {
    let permissions = Permissions {
        llm: Some(LlmGrant {
            can_modify_prompt: true,
            ..Default::default()
        }),
        ..Default::default()
    };
    let plugin = loaded(manifest("upper", permissions));
    let bridge = connected_bridge("upper", |method, payload| {
        assert_eq!(method, "onPromptReceived");
        let prompt = payload["prompt"].as_str().unwrap_or_default();
        json!(prompt.to_uppercase())
    })
    .await;

    let mut bridges = HashMap::new();
    bridges.insert(plugin.manifest.id.clone(), bridge);
    let orchestrator = Orchestrator::new(vec![plugin], bridges);

    let outcome = orchestrator.process_prompt("hello".to_string()).await;
    assert!(matches!(outcome, PipelineOutcome::Continued(ref s) if s == "HELLO"));
}

#[tokio::test]
async fn process_prompt_stops_at_interception() {
    let permissions = Permissions {
        llm: Some(LlmGrant {
            can_modify_prompt: true,
            ..Default::default()
        }),
        ..Default::default()
    };
    let plugin = loaded(manifest("cache", permissions));
    let bridge = connected_bridge("cache", |_method, _payload| {
        json!({"__intercept": true, "result": "cached answer"})
    })
    .await;

    let mut bridges = HashMap::new();
    bridges.insert(plugin.manifest.id.clone(), bridge);
    let orchestrator = Orchestrator::new(vec![plugin], bridges);

    let outcome = orchestrator.process_prompt("hello".to_string()).await;
    match outcome {
        PipelineOutcome::Intercepted { result, plugin_id } => {
            assert_eq!(result, json!("cached answer"));
            assert_eq!(plugin_id.as_ref(), "cache");
        }
        other => panic!("expected interception, got {other:?}"),
    }
}

#[tokio::test]
async fn process_prompt_skips_plugins_without_the_grant() {
    let plugin = loaded(manifest("bystander", Permissions::default()));
    let bridge = connected_bridge("bystander", |_method, _payload| {
        panic!("should never be called: plugin lacks can_modify_prompt")
    })
    .await;

    let mut bridges = HashMap::new();
    bridges.insert(plugin.manifest.id.clone(), bridge);
    let orchestrator = Orchestrator::new(vec![plugin], bridges);

    let outcome = orchestrator.process_prompt("hello".to_string()).await;
    assert!(matches!(outcome, PipelineOutcome::Continued(ref s) if s == "hello"));
}

#[tokio::test]
async fn collect_tools_namespaces_by_plugin_id() {
    let plugin = loaded(manifest("weather", Permissions::default()));
    let bridge = connected_bridge("weather", |method, _payload| {
        assert_eq!(method, "getTools");
        json!([{"name": "forecast", "description": "get a forecast", "inputSchema": {"type": "object"}}])
    })
    .await;

    let mut bridges = HashMap::new();
    bridges.insert(plugin.manifest.id.clone(), bridge);
    let orchestrator = Orchestrator::new(vec![plugin], bridges);

    let tools = orchestrator.collect_tools().await;
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, "weather__forecast");
}

#[tokio::test]
async fn execute_tool_routes_to_the_owning_bridge() {
    let plugin = loaded(manifest("weather", Permissions::default()));
    let bridge = connected_bridge("weather", |method, payload| {
        assert_eq!(method, "executeTool");
        assert_eq!(payload["name"], json!("forecast"));
        json!({"success": true, "result": "sunny"})
    })
    .await;

    let mut bridges = HashMap::new();
    bridges.insert(plugin.manifest.id.clone(), bridge);
    let orchestrator = Orchestrator::new(vec![plugin], bridges);

    let result = orchestrator
        .execute_tool("weather__forecast", json!({"city": "sf"}))
        .await
        .unwrap();
    assert_eq!(result, json!({"success": true, "result": "sunny"}));
}

#[tokio::test]
async fn execute_tool_on_unknown_plugin_is_not_found() {
    let orchestrator = Orchestrator::new(Vec::new(), HashMap::new());
    let err = orchestrator
        .execute_tool("ghost__anything", Value::Null)
        .await
        .unwrap_err();
    assert_eq!(err.code().as_ref(), "PLUGIN_NOT_FOUND");
}
