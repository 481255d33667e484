//! Integration tests for the chat turn driver (§4.9), over an orchestrator
//! with no plugins loaded (so every pipeline phase is a no-op pass-through,
//! §4.8 "`undefined` carries the value unchanged") and a scripted LLM.

use std::collections::HashMap;
use std::sync::Arc;

use bastion_chat::{ChatDriver, ChatRequest, ChatEvent, InMemoryConversationStore, LlmProfiles};
use bastion_llm::testing::ScriptedProvider;
use bastion_orchestrator::{Orchestrator, OrchestratorHandle};
use tokio::sync::mpsc;

fn driver_with_reply(reply: &str) -> ChatDriver {
    let handle = OrchestratorHandle::new();
    handle.set(Orchestrator::new(Vec::new(), HashMap::new())).unwrap();
    let profiles = Arc::new(LlmProfiles::new(Arc::new(ScriptedProvider { final_text: reply.to_string() })));
    let store = Arc::new(InMemoryConversationStore::new());
    ChatDriver::new(handle, profiles, store)
}

async fn drain(mut rx: mpsc::Receiver<ChatEvent>) -> Vec<ChatEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        let terminal = event.is_terminal();
        events.push(event);
        if terminal {
            break;
        }
    }
    events
}

#[tokio::test]
async fn a_plain_turn_emits_meta_delta_and_done() {
    let driver = driver_with_reply("general kenobi");
    let (tx, rx) = mpsc::channel(16);

    driver
        .run_turn(
            ChatRequest {
                message: "hello there".to_string(),
                conversation_id: None,
                profile_id: None,
                title: None,
                system_prompt: None,
            },
            tx,
        )
        .await;

    let events = drain(rx).await;
    assert!(matches!(events.first(), Some(ChatEvent::Meta { .. })));
    assert!(events.iter().any(|e| matches!(e, ChatEvent::Delta { text } if text == "general kenobi")));
    let ChatEvent::Done { response, .. } = events.last().expect("a terminal event") else {
        panic!("expected a terminating done event, got {:?}", events.last());
    };
    assert_eq!(response, "general kenobi");
}

#[tokio::test]
async fn conversation_history_round_trips_through_the_store() {
    let driver = driver_with_reply("second reply");
    let (tx, rx) = mpsc::channel(16);

    driver
        .run_turn(
            ChatRequest {
                message: "first message".to_string(),
                conversation_id: Some("conv-fixed".to_string()),
                profile_id: None,
                title: None,
                system_prompt: None,
            },
            tx,
        )
        .await;
    let events = drain(rx).await;
    let ChatEvent::Meta { conversation_id, .. } = &events[0] else {
        panic!("expected a leading meta event");
    };
    assert_eq!(conversation_id, "conv-fixed");
}

#[tokio::test]
async fn an_explicit_title_overrides_derivation() {
    let driver = driver_with_reply("ack");
    let (tx, rx) = mpsc::channel(16);

    driver
        .run_turn(
            ChatRequest {
                message: "this message has a very long first sentence that would otherwise become the title.".to_string(),
                conversation_id: None,
                profile_id: None,
                title: Some("Custom Title".to_string()),
                system_prompt: None,
            },
            tx,
        )
        .await;

    let _ = drain(rx).await;
}

#[tokio::test]
async fn an_unknown_profile_id_fails_fast_with_a_typed_error() {
    let driver = driver_with_reply("unused");
    let (tx, rx) = mpsc::channel(16);

    driver
        .run_turn(
            ChatRequest {
                message: "hi".to_string(),
                conversation_id: None,
                profile_id: Some("ghost-profile".to_string()),
                title: None,
                system_prompt: None,
            },
            tx,
        )
        .await;

    let events = drain(rx).await;
    let last = events.last().expect("at least a meta and an error event");
    assert!(matches!(last, ChatEvent::Error { code: Some(code), .. } if code == "PROFILE_NOT_FOUND"));
}
