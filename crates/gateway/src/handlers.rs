use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use mcp::{CallToolResult, Tool};
use runtime::{Backend, ChatOutcome, Exchange, HistoryTurn, ToolArguments, ToolHostClient};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::{ApiError, AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolsResponse {
    pub tools: Vec<Tool>,
}

#[derive(Debug, Deserialize)]
pub struct ToolCallRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<HistoryTurn>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub connected: bool,
    pub openai_configured: bool,
}

pub(crate) async fn list_tools<B: Backend, H: ToolHostClient>(
    State(state): State<AppState<B, H>>,
) -> Result<Json<ToolsResponse>, ApiError> {
    let tools = state.host.list_tools().await?;
    Ok(Json(ToolsResponse { tools }))
}

pub(crate) async fn call_tool<B: Backend, H: ToolHostClient>(
    State(state): State<AppState<B, H>>,
    payload: Result<Json<ToolCallRequest>, JsonRejection>,
) -> Result<Json<CallToolResult>, ApiError> {
    let Json(request) = payload?;
    info!(tool = %request.name, "direct tool call");
    let arguments = ToolArguments::try_from(request.arguments)?;
    let result = state.host.call_tool(&request.name, arguments).await?;
    Ok(Json(result))
}

pub(crate) async fn chat<B: Backend, H: ToolHostClient>(
    State(state): State<AppState<B, H>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatOutcome>, ApiError> {
    let Json(request) = payload?;
    info!(history = request.history.len(), "chat request");
    let outcome = Exchange::new(state.backend.as_ref(), state.host.as_ref())
        .with_system_prompt(&state.system_prompt)
        .run(&request.message, &request.history)
        .await?;
    Ok(Json(outcome))
}

pub(crate) async fn health<B: Backend, H: ToolHostClient>(
    State(state): State<AppState<B, H>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        connected: state.host.is_connected().await,
        openai_configured: state.backend.is_configured(),
    })
}
