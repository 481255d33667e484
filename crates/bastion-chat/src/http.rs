//! The HTTP surface (§6): `POST /api/v1/chat`, plugin routes mounted under
//! `/api/v1/p/{pluginId}/*`, and a liveness probe.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json};
use axum::routing::{any, get, post};
use axum::Router;
use futures::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use bastion_core::PluginId;
use bastion_orchestrator::{PluginHttpRequest, PluginHttpResponse};

use crate::driver::ChatRequest as DriverRequest;
use crate::error::ChatError;
use crate::events::ChatEvent;
use crate::state::AppState;

/// Build the router: the chat endpoint, plugin HTTP routes, and
/// `/healthz`.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/v1/chat", post(chat))
        .route("/api/v1/p/:plugin_id/*rest", any(plugin_route))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct ChatRequestBody {
    message: String,
    #[serde(rename = "conversationId", default)]
    conversation_id: Option<String>,
    #[serde(rename = "profileId", default)]
    profile_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    stream: bool,
    #[serde(rename = "systemPrompt", default)]
    system_prompt: Option<String>,
}

fn wants_stream(headers: &HeaderMap, body: &ChatRequestBody) -> bool {
    if body.stream {
        return true;
    }
    headers
        .get(axum::http::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/event-stream"))
}

async fn chat(State(state): State<AppState>, headers: HeaderMap, Json(body): Json<ChatRequestBody>) -> impl IntoResponse {
    let stream_requested = wants_stream(&headers, &body);
    let request = DriverRequest {
        message: body.message,
        conversation_id: body.conversation_id,
        profile_id: body.profile_id,
        title: body.title,
        system_prompt: body.system_prompt,
    };

    let (tx, rx) = mpsc::channel(32);
    let driver = state.driver.clone();
    tokio::spawn(async move {
        driver.run_turn(request, tx).await;
    });

    if stream_requested {
        sse_response(rx).into_response()
    } else {
        json_response(rx).await.into_response()
    }
}

fn sse_response(mut rx: mpsc::Receiver<ChatEvent>) -> Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>> {
    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            let name = event.event_name();
            let data = serde_json::to_string(&event).unwrap_or_default();
            let terminal = event.is_terminal();
            yield Ok(Event::default().event(name).data(data));
            if terminal {
                break;
            }
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn json_response(mut rx: mpsc::Receiver<ChatEvent>) -> impl IntoResponse {
    let mut conversation_id = String::new();
    let mut user_message_id = String::new();
    let mut assistant_message_id = String::new();
    let mut response_text = String::new();
    let mut tool_calls: Vec<Value> = Vec::new();
    let mut error: Option<(String, Option<String>, Option<String>)> = None;

    while let Some(event) = rx.recv().await {
        match event {
            ChatEvent::Meta { conversation_id: c, user_message_id: u } => {
                conversation_id = c;
                user_message_id = u;
            }
            ChatEvent::Done { conversation_id: c, user_message_id: u, assistant_message_id: a, response, tool_calls: t } => {
                conversation_id = c;
                user_message_id = u;
                assistant_message_id = a;
                response_text = response;
                tool_calls = t;
            }
            ChatEvent::Error { message, code, blocked_by } => {
                error = Some((message, code, blocked_by));
            }
            _ => {}
        }
    }

    if let Some((message, code, blocked_by)) = error {
        let status = code
            .as_deref()
            .map(status_for_code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (
            status,
            Json(json!({
                "success": false,
                "message": message,
                "code": code,
                "blockedBy": blocked_by,
                "conversationId": if conversation_id.is_empty() { Value::Null } else { json!(conversation_id) },
            })),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "conversationId": conversation_id,
            "response": response_text,
            "toolCalls": tool_calls,
            "messages": {
                "user": user_message_id,
                "assistant": assistant_message_id,
            },
        })),
    )
        .into_response()
}

fn status_for_code(code: &str) -> StatusCode {
    match code {
        "PERMISSION_DENIED" => StatusCode::FORBIDDEN,
        "PLUGIN_NOT_FOUND" | "CONVERSATION_NOT_FOUND" | "PROFILE_NOT_FOUND" => StatusCode::NOT_FOUND,
        "MALFORMED_FULL_NAME" => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn plugin_route(
    State(state): State<AppState>,
    Path((plugin_id, rest)): Path<(String, String)>,
    method: axum::http::Method,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> impl IntoResponse {
    let plugin_id = match PluginId::parse(plugin_id) {
        Ok(id) => id,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(json!({ "success": false, "message": e.to_string() })))
                .into_response();
        }
    };

    let parsed_body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let header_map: HashMap<String, String> = headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect();

    let request = PluginHttpRequest {
        method: method.as_str().to_string(),
        path: format!("/{rest}"),
        headers: header_map,
        body: parsed_body,
    };

    let Some(orchestrator) = state.orchestrator.get() else {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "success": false, "message": "orchestrator not yet initialized" })))
            .into_response();
    };

    match orchestrator.route_http_request(&plugin_id, request).await {
        Ok(PluginHttpResponse { status, headers, body }) => {
            let mut response = Json(body).into_response();
            *response.status_mut() = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
            for (name, value) in headers {
                if let (Ok(name), Ok(value)) = (
                    axum::http::HeaderName::try_from(name),
                    axum::http::HeaderValue::try_from(value),
                ) {
                    response.headers_mut().insert(name, value);
                }
            }
            response
        }
        Err(e) => {
            let chat_error = ChatError::Orchestrator(e);
            (
                chat_error.status(),
                Json(json!({
                    "success": false,
                    "message": chat_error.to_string(),
                    "code": chat_error.code(),
                    "blockedBy": chat_error.blocked_by(),
                })),
            )
                .into_response()
        }
    }
}
