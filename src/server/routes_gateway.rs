//! Tool gateway and workflow endpoints, served at the root.

use crate::orchestrator::WorkflowRequest;
use crate::server::{AppContext, AppError};
use crate::tools::remote::RemoteToolServer;
use crate::tools::{RegisterRequest, ToolCallRequest, ToolCallResponse, ToolGateway};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use moviehub_common::Error;
use std::sync::Arc;
use std::time::Duration;

pub fn gateway_routes() -> Router<AppContext> {
    Router::new()
        .route("/execute", post(execute))
        .route("/tools", get(list_tools))
        .route("/servers", get(list_servers))
        .route("/call-tool", post(call_tool))
        .route("/register", post(register))
}

/// Always 200; workflow failures are reported inside the result.
async fn execute(
    State(ctx): State<AppContext>,
    Json(request): Json<WorkflowRequest>,
) -> impl IntoResponse {
    let result = ctx
        .orchestrator
        .execute(&request.query, request.user_id.as_deref())
        .await;
    Json(serde_json::json!({ "success": true, "result": result }))
}

async fn list_tools(State(ctx): State<AppContext>) -> Result<impl IntoResponse, AppError> {
    let tools = ctx
        .orchestrator
        .gateway()
        .list_tools()
        .await
        .map_err(|e| Error::upstream("gateway", e))?;
    Ok(Json(serde_json::json!({ "tools": tools })))
}

async fn list_servers(State(ctx): State<AppContext>) -> impl IntoResponse {
    Json(serde_json::json!({ "servers": ctx.tools.list() }))
}

async fn call_tool(
    State(ctx): State<AppContext>,
    Json(request): Json<ToolCallRequest>,
) -> (StatusCode, Json<ToolCallResponse>) {
    match ctx.tools.call_tool(&request.tool_name, request.args).await {
        Ok(result) => (
            StatusCode::OK,
            Json(ToolCallResponse {
                success: true,
                result: Some(result),
                error: None,
            }),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ToolCallResponse {
                success: false,
                result: None,
                error: Some(e.to_string()),
            }),
        ),
    }
}

async fn register(
    State(ctx): State<AppContext>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = body.map_err(|e| {
        Error::Validation(format!("server name and endpoint are required: {}", e.body_text()))
    })?;
    if request.name.trim().is_empty() || request.endpoint.trim().is_empty() {
        return Err(Error::Validation("server name and endpoint are required".into()).into());
    }

    let timeout = Duration::from_secs(ctx.config.orchestrator.tool_timeout_secs);
    ctx.tools
        .register(Arc::new(RemoteToolServer::new(request, timeout)));

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Server registered successfully",
    })))
}
