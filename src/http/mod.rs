//! REST 前端
//!
//! | 路由 | 说明 |
//! |------|------|
//! | `GET /health` | 存活检查 |
//! | `GET /api-docs` | OpenAPI 文档（JSON）；`/api-docs/openapi.yaml` 为原始 YAML |
//! | `POST/GET /api/todos` | 创建 / 列表 |
//! | `GET/PUT/DELETE /api/todos/{id}` | 单条读写 |
//! | `GET /api/tools` | 工具目录 |
//! | `POST /api/tools/{name}` | 通过调度桥调用工具 |
//! | `POST /mcp/message` | JSON-RPC MCP 端点，供远端对话 Agent 使用 |

mod error;
mod handlers;

pub use error::ApiError;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::Result;
use crate::mcp::McpServer;
use crate::todo::TodoService;
use crate::tools::TodoDispatcher;

/// 处理器共享的句柄，启动时构造一次
#[derive(Clone)]
pub struct AppState {
    pub service: TodoService,
    pub dispatcher: Arc<TodoDispatcher>,
    pub mcp: McpServer,
}

impl AppState {
    pub fn new(service: TodoService) -> Self {
        let dispatcher = Arc::new(TodoDispatcher::new(service.clone()));
        Self {
            mcp: McpServer::new(dispatcher.clone()),
            dispatcher,
            service,
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api-docs", get(handlers::api_docs))
        .route("/api-docs/openapi.yaml", get(handlers::api_docs_yaml))
        .route(
            "/api/todos",
            post(handlers::create_todo).get(handlers::list_todos),
        )
        .route(
            "/api/todos/{id}",
            get(handlers::get_todo)
                .put(handlers::update_todo)
                .delete(handlers::delete_todo),
        )
        .route("/api/tools", get(handlers::list_tools))
        .route("/api/tools/{name}", post(handlers::invoke_tool))
        .route("/mcp/message", post(handlers::mcp_message))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 绑定端口并服务，Ctrl-C 时优雅退出
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🚀 REST 服务已启动: http://{}", listener.local_addr()?);
    axum::serve(listener, app_router(state))
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_err() {
                futures::future::pending::<()>().await;
            }
            info!("收到退出信号，正在关闭");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FailingTodoStore;
    use crate::todo::store::InMemoryTodoStore;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app() -> Router {
        app_router(AppState::new(TodoService::new(Arc::new(InMemoryTodoStore::new()))))
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let resp = app
            .clone()
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("response");
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::String(
                String::from_utf8_lossy(&bytes).to_string(),
            ))
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health_reports_ok() {
        let (status, body) = send(&app(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_todo_lifecycle() {
        let app = app();
        let (status, created) = send(
            &app,
            "POST",
            "/api/todos",
            Some(json!({"title": "Buy milk", "priority": "high"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["title"], "Buy milk");
        assert_eq!(created["priority"], "high");
        assert_eq!(created["completed"], false);
        let id = created["id"].as_str().unwrap().to_string();

        let (status, listed) = send(&app, "GET", "/api/todos", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, updated) = send(
            &app,
            "PUT",
            &format!("/api/todos/{id}"),
            Some(json!({"completed": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["completed"], true);
        assert_eq!(updated["title"], "Buy milk");

        let (status, deleted) = send(&app, "DELETE", &format!("/api/todos/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["message"], "Todo deleted successfully");
        assert_eq!(deleted["todo"]["id"], json!(id));

        let (status, body) = send(&app, "GET", &format!("/api/todos/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Todo not found"}));
    }

    #[tokio::test]
    async fn test_create_requires_title() {
        let app = app();
        let (status, body) = send(&app, "POST", "/api/todos", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Title is required"}));

        let (status, body) = send(
            &app,
            "POST",
            "/api/todos",
            Some(json!({"title": "x", "priority": "critical"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("priority"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let req = Request::builder()
            .method("POST")
            .uri("/api/todos")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .expect("request");
        let resp = app().oneshot(req).await.expect("response");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
        let body: Value = serde_json::from_slice(&bytes).expect("json");
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_missing_records_are_404() {
        let app = app();
        let (status, _) = send(
            &app,
            "PUT",
            "/api/todos/nope",
            Some(json!({"title": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, "DELETE", "/api/todos/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_storage_faults_are_500_with_fixed_message() {
        let app = app_router(AppState::new(TodoService::new(Arc::new(
            FailingTodoStore::new("disk on fire"),
        ))));
        let (status, body) = send(&app, "GET", "/api/todos", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Failed to fetch todos"}));

        let (status, body) = send(
            &app,
            "POST",
            "/api/todos",
            Some(json!({"title": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Failed to create todo"}));
    }

    #[tokio::test]
    async fn test_tools_discovery_and_invocation() {
        let app = app();
        let (status, tools) = send(&app, "GET", "/api/tools", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tools.as_array().unwrap().len(), 6);
        assert!(tools[0]["inputSchema"].is_object());

        let (status, result) = send(
            &app,
            "POST",
            "/api/tools/create_todo",
            Some(json!({"title": "Via tool"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(result.get("isError").is_none());

        let (_, result) = send(&app, "POST", "/api/tools/nope", Some(json!({}))).await;
        assert_eq!(result["isError"], true);
    }

    #[tokio::test]
    async fn test_mcp_over_http() {
        let app = app();
        let (status, body) = send(
            &app,
            "POST",
            "/mcp/message",
            Some(json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 6);

        let (status, _) = send(
            &app,
            "POST",
            "/mcp/message",
            Some(json!({"jsonrpc": "2.0", "method": "notifications/initialized"})),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_rest_coerces_like_the_tool_bridge() {
        let app = app();
        let (_, created) = send(&app, "POST", "/api/todos", Some(json!({"title": 42}))).await;
        assert_eq!(created["title"], "42");
        let id = created["id"].as_str().unwrap().to_string();

        let (status, updated) = send(
            &app,
            "PUT",
            &format!("/api/todos/{id}"),
            Some(json!({"completed": "true"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["completed"], true);

        let (status, body) = send(
            &app,
            "PUT",
            &format!("/api/todos/{id}"),
            Some(json!({"completed": [1]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("expected boolean"));
    }

    #[tokio::test]
    async fn test_api_docs_describe_rest_routes() {
        let app = app();
        let (status, doc) = send(&app, "GET", "/api-docs", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(doc["openapi"].as_str().unwrap().starts_with("3."));
        for path in ["/health", "/api/todos", "/api/todos/{id}"] {
            assert!(doc["paths"].get(path).is_some(), "missing {}", path);
        }
        assert_eq!(
            doc["components"]["schemas"]["Priority"]["enum"],
            json!(["low", "medium", "high", "urgent"])
        );

        let (status, raw) = send(&app, "GET", "/api-docs/openapi.yaml", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(raw.as_str().unwrap().starts_with("openapi:"));
    }
}
