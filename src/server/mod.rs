//! HTTP Server
//!
//! Thin axum surface over the application state:
//!
//! - `GET  /health`
//! - `GET  /tools` - function definitions to register with the assistant
//! - `GET  /operation-status/{id}`
//! - `POST /conversations/{id}/files?filename=<name>` - raw file body
//! - `POST /conversations/{id}/analyze` - `{query, filename?}`
//! - `POST /conversations/{id}/tool-calls` - `{tool_call_id, name, arguments}`
//!   as issued by the assistant during a run; `arguments` may be a JSON string

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use analyst_tools::PandasAgentArgs;

use crate::models::{FileCategory, OperationStatus};
use crate::services::platform::{post_file_awareness, register_file, unregister_files};
use crate::services::tools::stage_upload;
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let status = match &err {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        api_error(status, err.to_string())
    }
}

/// Build the router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tools", get(list_tools))
        .route("/operation-status/{id}", get(operation_status))
        .route("/conversations/{id}/files", post(upload_file))
        .route("/conversations/{id}/analyze", post(analyze))
        .route("/conversations/{id}/tool-calls", post(tool_call))
        .with_state(state)
}

/// Serve on an already bound listener until the process stops.
pub async fn serve_on(listener: TcpListener, state: Arc<AppState>) -> AppResult<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Bind the configured address and serve.
pub async fn serve(state: Arc<AppState>) -> AppResult<()> {
    let addr = state.config().bind_addr.clone();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("[Server] Listening on {}", addr);
    serve_on(listener, state).await
}

async fn health() -> &'static str {
    "ok"
}

async fn list_tools(State(state): State<Arc<AppState>>) -> Json<Vec<Value>> {
    Json(state.tools().function_definitions())
}

async fn operation_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OperationStatus>, ApiError> {
    state
        .progress()
        .get(&id)
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("No operation found with ID {}", id)))
}

#[derive(Debug, Deserialize)]
struct UploadQuery {
    filename: String,
}

#[derive(Debug, Serialize)]
struct TableInfo {
    name: String,
    rows: usize,
    columns: usize,
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    file: String,
    category: FileCategory,
    tables: Vec<TableInfo>,
    evicted: Vec<String>,
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

async fn upload_file(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<UploadResponse>, ApiError> {
    let (record, category) = stage_upload(&state.config().scratch_dir, &query.filename, &body)?;

    if !category.is_tabular() {
        if let Err(e) = std::fs::remove_file(&record.path) {
            tracing::warn!("[Server] Could not remove staged file {}: {}", record.path.display(), e);
        }
        return Ok(Json(UploadResponse {
            file: record.name,
            category,
            tables: Vec::new(),
            evicted: Vec::new(),
            error: None,
            note: Some("File type is not handled by tabular analysis".to_string()),
        }));
    }

    let platform = state.platform().as_ref();
    if let Err(e) = register_file(platform, &conversation_id, &record).await {
        tracing::warn!("[Server] Could not register '{}' on thread {}: {}", record.name, conversation_id, e);
    }

    let outcome = state.store().add_file(&conversation_id, record.clone()).await;

    if !outcome.evicted.is_empty() {
        if let Err(e) = unregister_files(platform, &conversation_id, &outcome.evicted).await {
            tracing::warn!("[Server] Could not prune file registry of thread {}: {}", conversation_id, e);
        }
    }
    if outcome.error.is_none() {
        if let Err(e) = post_file_awareness(platform, &conversation_id, &record).await {
            tracing::warn!("[Server] Could not post file awareness for '{}': {}", record.name, e);
        }
    }

    let tables = outcome
        .tables
        .unwrap_or_default()
        .into_iter()
        .map(|(name, table)| TableInfo {
            name,
            rows: table.row_count(),
            columns: table.column_count(),
        })
        .collect();

    Ok(Json(UploadResponse {
        file: record.name,
        category,
        tables,
        evicted: outcome.evicted,
        error: outcome.error.map(|e| e.to_string()),
        note: None,
    }))
}

#[derive(Debug, Serialize)]
struct AnalyzeResponse {
    response: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    operation_id: Option<String>,
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let args = PandasAgentArgs::from_value(body).map_err(AppError::from)?;
    let result = state
        .pandas_agent()
        .run_analysis(Some(conversation_id.as_str()), &args)
        .await;

    Ok(Json(AnalyzeResponse {
        response: result.to_content(),
        success: result.success,
        operation_id: result.operation_id,
    }))
}

#[derive(Debug, Deserialize)]
struct ToolCallRequest {
    tool_call_id: String,
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Serialize)]
struct ToolCallResponse {
    tool_call_id: String,
    output: Value,
}

/// Function-call arguments arrive JSON-encoded from the assistant platform.
fn decode_arguments(arguments: Value) -> AppResult<Value> {
    match arguments {
        Value::String(raw) => serde_json::from_str(&raw)
            .map_err(|e| AppError::validation(format!("Invalid tool arguments: {}", e))),
        other => Ok(other),
    }
}

async fn tool_call(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
    Json(request): Json<ToolCallRequest>,
) -> Result<Json<ToolCallResponse>, ApiError> {
    let arguments = decode_arguments(request.arguments)?;
    let long_running = state
        .tools()
        .get(&request.name)
        .is_some_and(|tool| tool.is_long_running());
    tracing::info!(
        "[Server] Tool call {} ({}{}) on thread {}",
        request.tool_call_id,
        request.name,
        if long_running { ", long-running" } else { "" },
        conversation_id
    );

    let ctx = state.tool_context(Some(conversation_id), request.tool_call_id.clone());
    let output = state
        .tools()
        .execute(&request.name, &ctx, arguments)
        .await
        .map_err(AppError::from)?;

    Ok(Json(ToolCallResponse {
        tool_call_id: request.tool_call_id,
        output,
    }))
}
