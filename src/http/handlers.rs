//! REST 处理器
//!
//! 每个处理器只做三件事：取参数、调服务、把 [`Outcome`] 映射为状态码。

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::error;

use super::AppState;
use super::error::ApiError;
use crate::mcp::McpToolCallResult;
use crate::todo::{CreateTodoInput, Outcome, Todo, UpdateTodoInput};
use crate::tools::catalog::{self, CREATE_TODO, UPDATE_TODO};
use crate::tools::{ToolSpec, schema};

type ApiResult<T> = std::result::Result<T, ApiError>;
type JsonBody = std::result::Result<Json<Value>, JsonRejection>;

/// REST 文档，编译期嵌入
const OPENAPI_YAML: &str = include_str!("openapi.yaml");

/// 请求体先按 JSON 取出，按对应工具的 schema 做与调度桥相同的类型规整，
/// 再反序列化为输入结构；每一步的失败都是 400
fn parse_body<T: DeserializeOwned>(tool: &str, body: JsonBody) -> ApiResult<T> {
    let Json(value) = body?;
    let schema = catalog::find_tool(tool)
        .map(|spec| spec.input_schema)
        .unwrap_or(Value::Null);
    let args = schema::normalize(&schema, value).map_err(ApiError::BadRequest)?;
    serde_json::from_value(Value::Object(args))
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))
}

fn found(outcome: Outcome<Todo>) -> ApiResult<Todo> {
    match outcome {
        Outcome::Ok(todo) => Ok(todo),
        Outcome::NotFound => Err(ApiError::NotFound),
        Outcome::Invalid(reason) => Err(ApiError::BadRequest(reason)),
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// ── /api-docs ────────────────────────────────────────────────────────────────

pub async fn api_docs() -> ApiResult<Json<Value>> {
    serde_yaml::from_str(OPENAPI_YAML).map(Json).map_err(|e| {
        error!(error = %e, "❌ OpenAPI 文档解析失败");
        ApiError::Internal("Failed to load API docs")
    })
}

pub async fn api_docs_yaml() -> Response {
    ([(header::CONTENT_TYPE, "application/yaml")], OPENAPI_YAML).into_response()
}

// ── /api/todos ───────────────────────────────────────────────────────────────

pub async fn create_todo(
    State(state): State<AppState>,
    body: JsonBody,
) -> ApiResult<Response> {
    let input: CreateTodoInput = parse_body(CREATE_TODO, body)?;
    let outcome = state
        .service
        .create_todo(input)
        .await
        .map_err(ApiError::fault("Failed to create todo"))?;
    let todo = found(outcome)?;
    Ok((StatusCode::CREATED, Json(todo)).into_response())
}

pub async fn list_todos(State(state): State<AppState>) -> ApiResult<Json<Vec<Todo>>> {
    let todos = state
        .service
        .get_all_todos()
        .await
        .map_err(ApiError::fault("Failed to fetch todos"))?;
    Ok(Json(todos))
}

pub async fn get_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Todo>> {
    let outcome = state
        .service
        .get_todo_by_id(&id)
        .await
        .map_err(ApiError::fault("Failed to fetch todo"))?;
    Ok(Json(found(outcome)?))
}

pub async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: JsonBody,
) -> ApiResult<Json<Todo>> {
    let input: UpdateTodoInput = parse_body(UPDATE_TODO, body)?;
    let outcome = state
        .service
        .update_todo(&id, input)
        .await
        .map_err(ApiError::fault("Failed to update todo"))?;
    Ok(Json(found(outcome)?))
}

pub async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let outcome = state
        .service
        .delete_todo(&id)
        .await
        .map_err(ApiError::fault("Failed to delete todo"))?;
    let todo = found(outcome)?;
    Ok(Json(json!({
        "message": "Todo deleted successfully",
        "todo": todo
    })))
}

// ── /api/tools ───────────────────────────────────────────────────────────────

pub async fn list_tools(State(state): State<AppState>) -> Json<Vec<ToolSpec>> {
    Json(state.dispatcher.list_tools())
}

/// 工具调用在 HTTP 层总是 200，成败由 `isError` 表达
pub async fn invoke_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: JsonBody,
) -> ApiResult<Json<McpToolCallResult>> {
    let Json(arguments) = body?;
    let envelope = state.dispatcher.invoke(&name, arguments).await;
    Ok(Json(envelope.into()))
}

// ── /mcp/message ─────────────────────────────────────────────────────────────

/// JSON-RPC over HTTP；通知没有响应体，返回 202
pub async fn mcp_message(State(state): State<AppState>, body: String) -> Response {
    match state.mcp.handle_line(&body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}
