//! The chat turn driver (§4.9): glues the orchestrator pipelines, the LLM
//! provider, conversation persistence, and the SSE event stream together.

use std::sync::Arc;

use futures::StreamExt;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use bastion_llm::{LlmProvider, LlmToolDefinition, Message, StreamEvent};
use bastion_orchestrator::{Orchestrator, OrchestratorHandle, PipelineOutcome, ToolInvocationOutcome};

use crate::error::ChatError;
use crate::events::ChatEvent;
use crate::profiles::LlmProfiles;
use crate::store::{ConversationStore, StoredMessage};
use crate::title::derive_title;

/// Request parameters for one chat turn (§6 `POST /api/v1/chat` body).
pub struct ChatRequest {
    /// The user's message text.
    pub message: String,
    /// Existing conversation id, or `None` to start a new one.
    pub conversation_id: Option<String>,
    /// Named LLM profile to use, or `None` for the default.
    pub profile_id: Option<String>,
    /// Caller-supplied title; overrides title derivation when present.
    pub title: Option<String>,
    /// Optional caller-supplied system prompt, prepended before the
    /// advertised-tools block.
    pub system_prompt: Option<String>,
}

/// Everything one chat turn needs: a handle to the orchestrator (filled
/// once bootstrap completes, see [`OrchestratorHandle`]), the LLM profile
/// registry, and the conversation store.
pub struct ChatDriver {
    orchestrator: OrchestratorHandle,
    profiles: Arc<LlmProfiles>,
    store: Arc<dyn ConversationStore>,
}

impl ChatDriver {
    /// Build a driver over an orchestrator handle, LLM profile registry,
    /// and conversation store. The handle need not be filled yet; it must
    /// be filled before the first call to [`Self::run_turn`].
    #[must_use]
    pub fn new(orchestrator: OrchestratorHandle, profiles: Arc<LlmProfiles>, store: Arc<dyn ConversationStore>) -> Self {
        Self { orchestrator, profiles, store }
    }

    fn orch(&self) -> &Orchestrator {
        self.orchestrator.get().expect("orchestrator handle used before bootstrap completed")
    }

    /// Run one chat turn, emitting [`ChatEvent`]s to `tx` as the turn
    /// progresses. The stream is closed exactly once (§4.9): after the
    /// first terminal event, no further sends are attempted.
    pub async fn run_turn(&self, request: ChatRequest, tx: mpsc::Sender<ChatEvent>) {
        let conversation = self.store.fetch_or_create(request.conversation_id.as_deref()).await;
        let user_message_id = Uuid::new_v4().to_string();
        self.store
            .append_message(
                &conversation.id,
                StoredMessage {
                    id: user_message_id.clone(),
                    role: "user".to_string(),
                    content: request.message.clone(),
                    metadata: Value::Null,
                },
            )
            .await;

        if send(&tx, ChatEvent::Meta {
            conversation_id: conversation.id.clone(),
            user_message_id: user_message_id.clone(),
        })
        .await
        .is_err()
        {
            return;
        }

        let title = request.title.clone().unwrap_or_else(|| derive_title(&request.message));
        if !title.is_empty() {
            self.store.set_title_if_absent(&conversation.id, &title).await;
        }

        let Some(llm) = self.profiles.resolve(request.profile_id.as_deref()) else {
            let _ = send(&tx, ChatEvent::Error {
                message: format!("unknown LLM profile: {:?}", request.profile_id),
                code: Some("PROFILE_NOT_FOUND".to_string()),
                blocked_by: None,
            })
            .await;
            return;
        };

        let prompt_outcome = self.orch().process_prompt(request.message.clone()).await;
        let prompt = match prompt_outcome {
            PipelineOutcome::Continued(prompt) => prompt,
            PipelineOutcome::Intercepted { result, plugin_id } => {
                let response = result.as_str().map_or_else(|| result.to_string(), str::to_string);
                self.persist_and_done(
                    &conversation.id,
                    &user_message_id,
                    &response,
                    Some(plugin_id.as_ref()),
                    Vec::new(),
                    &tx,
                )
                .await;
                return;
            }
            PipelineOutcome::Failed(e) => {
                let chat_error = ChatError::Orchestrator(e);
                let _ = send(&tx, ChatEvent::Error {
                    message: chat_error.to_string(),
                    code: chat_error.code().map(|c| c.to_string()),
                    blocked_by: chat_error.blocked_by(),
                })
                .await;
                return;
            }
        };

        let mut tool_calls_made: Vec<Value> = Vec::new();
        let tools = self.orch().collect_tools().await;

        let system_prompt = self.build_system_prompt(request.system_prompt.as_deref(), &tools).await;

        let history = self.load_history(&conversation.id).await;
        let mut messages = history;
        messages.push(Message::user(&prompt));

        let before_outcome = self.orch().before_llm_call(messages).await;
        let messages = match before_outcome {
            PipelineOutcome::Continued(messages) => messages,
            PipelineOutcome::Intercepted { result, plugin_id } => {
                let response = result.as_str().map_or_else(|| result.to_string(), str::to_string);
                self.persist_and_done(
                    &conversation.id,
                    &user_message_id,
                    &response,
                    Some(plugin_id.as_ref()),
                    Vec::new(),
                    &tx,
                )
                .await;
                return;
            }
            PipelineOutcome::Failed(e) => {
                let chat_error = ChatError::Orchestrator(e);
                let _ = send(&tx, ChatEvent::Error {
                    message: chat_error.to_string(),
                    code: chat_error.code().map(|c| c.to_string()),
                    blocked_by: chat_error.blocked_by(),
                })
                .await;
                return;
            }
        };

        let final_text = match self
            .stream_completion(llm.as_ref(), &system_prompt, &messages, &tools, &tx, &mut tool_calls_made)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                let _ = send(&tx, ChatEvent::Error { message: e.to_string(), code: None, blocked_by: None }).await;
                return;
            }
        };

        if let Some(response) = final_text {
            self.run_after_llm_call_and_finish(&conversation.id, &user_message_id, &response, tool_calls_made, &tx)
                .await;
        }
    }

    async fn build_system_prompt(&self, caller_prompt: Option<&str>, tools: &[LlmToolDefinition]) -> String {
        let base = caller_prompt.unwrap_or_default().to_string();
        let tools_block = if tools.is_empty() {
            String::new()
        } else {
            let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
            format!("\n\nAvailable tools: {}", names.join(", "))
        };
        self.orch().transform_system_message(format!("{base}{tools_block}")).await
    }

    async fn load_history(&self, conversation_id: &str) -> Vec<Message> {
        self.store
            .history(conversation_id)
            .await
            .iter()
            .map(|m| match m.role.as_str() {
                "assistant" => Message::assistant(&m.content),
                _ => Message::user(&m.content),
            })
            .collect()
    }

    /// Stream the LLM completion, dispatching tool calls via the
    /// tool-executor callback as they finish. Returns `Ok(Some(text))`
    /// with the final assistant text — from the stream directly, from
    /// the control envelope's short-circuit, or from the synthesis call
    /// when the stream ended with empty text after running tools.
    /// Returns `Ok(None)` only if the event receiver was dropped and the
    /// stream should be abandoned.
    async fn stream_completion(
        &self,
        llm: &dyn LlmProvider,
        system: &str,
        messages: &[Message],
        tools: &[LlmToolDefinition],
        tx: &mpsc::Sender<ChatEvent>,
        tool_calls_made: &mut Vec<Value>,
    ) -> Result<Option<String>, bastion_llm::LlmError> {
        let mut stream = llm.stream(messages, tools, system).await?;
        let mut text = String::new();
        let mut ran_any_tool = false;
        let mut pending: std::collections::HashMap<String, (String, String)> = std::collections::HashMap::new();

        while let Some(event) = stream.next().await {
            match event? {
                StreamEvent::TextDelta(fragment) => {
                    text.push_str(&fragment);
                    if send(tx, ChatEvent::Delta { text: fragment }).await.is_err() {
                        return Ok(None);
                    }
                }
                StreamEvent::ToolCallStart { id, name } => {
                    pending.insert(id, (name, String::new()));
                }
                StreamEvent::ToolCallDelta { id, args_delta } => {
                    if let Some((_, args)) = pending.get_mut(&id) {
                        args.push_str(&args_delta);
                    }
                }
                StreamEvent::ToolCallEnd { id } => {
                    let Some((name, args_json)) = pending.remove(&id) else {
                        continue;
                    };
                    ran_any_tool = true;
                    let args: Value = serde_json::from_str(&args_json).unwrap_or(Value::Object(Default::default()));

                    let _ = send(tx, ChatEvent::ToolStart { name: name.clone() }).await;

                    match self.orch().invoke_tool_or_skill(&name, args.clone()).await {
                        Ok(ToolInvocationOutcome::EndRequest(response)) => {
                            let _ = send(tx, ChatEvent::ToolResult { name: name.clone(), result: json!(response) }).await;
                            tool_calls_made.push(json!({ "name": name, "args": args }));
                            return Ok(Some(response));
                        }
                        Ok(ToolInvocationOutcome::Handoff(value)) => {
                            let _ = send(tx, ChatEvent::ToolResult { name: name.clone(), result: value.clone() }).await;
                            tool_calls_made.push(json!({ "name": name, "args": args, "result": value }));
                        }
                        Err(e) => {
                            let _ = send(tx, ChatEvent::ToolError { name: name.clone(), message: e.to_string() }).await;
                            tool_calls_made.push(json!({ "name": name, "args": args, "error": e.to_string() }));
                        }
                    }
                }
                StreamEvent::Usage { .. } | StreamEvent::Done => {}
                StreamEvent::Error(message) => {
                    return Err(bastion_llm::LlmError::StreamingError(message));
                }
            }
        }

        if text.is_empty() && ran_any_tool {
            let synthesis_prompt = format!(
                "Tool results:\n{}\n\nProduce a final answer for the user based on these results.",
                serde_json::to_string_pretty(tool_calls_made).unwrap_or_default()
            );
            let mut synthesis_messages = messages.to_vec();
            synthesis_messages.push(Message::assistant("Invoking tools to help answer."));
            synthesis_messages.push(Message::user(&synthesis_prompt));
            let response = llm.complete(&synthesis_messages, tools, system).await?;
            let synthesized = response.message.text().unwrap_or_default().to_string();
            return Ok(Some(synthesized));
        }

        Ok(Some(text))
    }

    /// Run `afterLLMCall` over `response`, then persist and emit `done`.
    /// Used by the normal (and synthesized) completion path, which must
    /// pass its text through `afterLLMCall` before it is final.
    async fn run_after_llm_call_and_finish(
        &self,
        conversation_id: &str,
        user_message_id: &str,
        response: &str,
        tool_calls: Vec<Value>,
        tx: &mpsc::Sender<ChatEvent>,
    ) {
        let after = self.orch().after_llm_call(json!({ "text": response })).await;
        let final_text = after
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or(response)
            .to_string();
        self.persist_and_done(conversation_id, user_message_id, &final_text, None, tool_calls, tx)
            .await;
    }

    /// Persist `response` as the assistant message and emit `done`,
    /// without running `afterLLMCall`. Used when a pipeline phase already
    /// intercepted the turn (§4.9: "persist that as the assistant reply
    /// and stop" — the turn never reaches the LLM call at all).
    async fn persist_and_done(
        &self,
        conversation_id: &str,
        user_message_id: &str,
        response: &str,
        intercepted_by: Option<&str>,
        tool_calls: Vec<Value>,
        tx: &mpsc::Sender<ChatEvent>,
    ) {
        let mut metadata = json!({});
        if let Some(plugin_id) = intercepted_by {
            metadata["interceptedBy"] = json!(plugin_id);
        }

        let assistant_message_id = Uuid::new_v4().to_string();
        self.store
            .append_message(
                conversation_id,
                StoredMessage {
                    id: assistant_message_id.clone(),
                    role: "assistant".to_string(),
                    content: response.to_string(),
                    metadata,
                },
            )
            .await;

        let _ = send(
            tx,
            ChatEvent::Done {
                conversation_id: conversation_id.to_string(),
                user_message_id: user_message_id.to_string(),
                assistant_message_id,
                response: response.to_string(),
                tool_calls,
            },
        )
        .await;
    }
}

async fn send(tx: &mpsc::Sender<ChatEvent>, event: ChatEvent) -> Result<(), ()> {
    if tx.send(event).await.is_err() {
        warn!("chat event receiver dropped; stream abandoned");
        return Err(());
    }
    Ok(())
}
