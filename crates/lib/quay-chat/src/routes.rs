use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use chrono::{SecondsFormat, Utc};
use quay_core::llm::{ChatModel, ConversationMessage, Usage};
use quay_core::store::TerminalStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::{ApiError, AppState};

/// Body of `POST /api/chat`.
///
/// `messages` is kept loose here so a missing or non-array value gets a
/// specific message instead of a generic decode error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: Option<String>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub provider: String,
    pub timestamp: String,
}

pub(crate) async fn chat<M, S>(
    State(state): State<AppState<M, S>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError>
where
    M: ChatModel + 'static,
    S: TerminalStore + 'static,
{
    let Json(request) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let history = parse_history(request.messages)?;
    let received = history.len();

    let reply = state.orchestrator.respond(history).await?;
    info!(
        messages = received,
        tools = ?reply.tools_used,
        total_tokens = reply.usage.map(|usage| usage.total_tokens),
        "chat turn complete"
    );

    Ok(Json(ChatResponse {
        message: reply.message,
        usage: reply.usage,
    }))
}

pub(crate) async fn health<M, S>(State(state): State<AppState<M, S>>) -> Json<HealthResponse>
where
    M: ChatModel + 'static,
    S: TerminalStore + 'static,
{
    Json(HealthResponse {
        status: "ok".to_string(),
        provider: state.orchestrator.model().provider_name().to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

fn parse_history(messages: Option<Value>) -> Result<Vec<ConversationMessage>, ApiError> {
    let Some(messages @ Value::Array(_)) = messages else {
        return Err(ApiError::bad_request("Messages array is required"));
    };
    serde_json::from_value(messages)
        .map_err(|err| ApiError::bad_request(format!("Invalid message: {err}")))
}
