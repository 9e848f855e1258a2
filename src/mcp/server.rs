//! MCP 服务端
//!
//! 把 [`TodoDispatcher`] 暴露为 MCP 工具服务。协议处理与传输无关：
//! [`McpServer::handle_line`] 处理一行报文，stdio 循环（[`McpServer::serve_stdio`]）
//! 和 HTTP 端点（`POST /mcp/message`）共用它。
//!
//! stdout 是协议通道，日志只能写 stderr。

use crate::error::Result;
use crate::mcp::types::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, InitializeResult, JsonRpcRequest,
    JsonRpcResponse, METHOD_NOT_FOUND, McpTool, McpToolCallParams, McpToolCallResult,
    McpToolsListResult, PARSE_ERROR, PROTOCOL_VERSION, PeerInfo, ServerCapabilities,
    ToolsCapability,
};
use crate::tools::TodoDispatcher;
use serde_json::{Value, json};
use std::sync::Arc;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

pub const SERVER_NAME: &str = "todo-mcp-server";

#[derive(Clone)]
pub struct McpServer {
    dispatcher: Arc<TodoDispatcher>,
}

impl McpServer {
    pub fn new(dispatcher: Arc<TodoDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// 处理一行原始报文；通知没有响应
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        match serde_json::from_str::<Value>(line) {
            Ok(message) => self.handle_message(message).await,
            Err(e) => {
                warn!(error = %e, "MCP: 无法解析的报文");
                Some(JsonRpcResponse::failure(
                    None,
                    PARSE_ERROR,
                    format!("Parse error: {}", e),
                ))
            }
        }
    }

    pub async fn handle_message(&self, message: Value) -> Option<JsonRpcResponse> {
        let id = message.get("id").cloned();
        match serde_json::from_value::<JsonRpcRequest>(message) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => Some(JsonRpcResponse::failure(
                id,
                INVALID_REQUEST,
                format!("Invalid request: {}", e),
            )),
        }
    }

    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            debug!(method = %request.method, "MCP: 收到通知");
            return None;
        }
        let id = request.id;
        debug!(method = %request.method, "MCP: 收到请求");

        let response = match request.method.as_str() {
            "initialize" => respond(id, &initialize(request.params.as_ref())),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => respond(id, &self.list_tools()),
            "tools/call" => match parse_call_params(request.params) {
                Ok(params) => respond(id, &self.call_tool(params).await),
                Err(message) => JsonRpcResponse::failure(id, INVALID_PARAMS, message),
            },
            other => {
                warn!(method = %other, "MCP: 未知方法");
                JsonRpcResponse::failure(
                    id,
                    METHOD_NOT_FOUND,
                    format!("Method not found: {}", other),
                )
            }
        };
        Some(response)
    }

    fn list_tools(&self) -> McpToolsListResult {
        McpToolsListResult {
            tools: self
                .dispatcher
                .list_tools()
                .into_iter()
                .map(McpTool::from)
                .collect(),
            next_cursor: None,
        }
    }

    async fn call_tool(&self, params: McpToolCallParams) -> McpToolCallResult {
        let arguments = params.arguments.unwrap_or(Value::Null);
        self.dispatcher.invoke(&params.name, arguments).await.into()
    }

    /// 按行读取请求、按行写回响应，直到输入结束
    ///
    /// 单行报文的任何问题（包括非 UTF-8 字节）只产生一条错误响应，循环继续。
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            let response = match std::str::from_utf8(&buf) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => self.handle_line(line.trim()).await,
                Err(e) => {
                    warn!(error = %e, "MCP: 报文不是合法的 UTF-8");
                    Some(JsonRpcResponse::failure(
                        None,
                        PARSE_ERROR,
                        format!("Parse error: {}", e),
                    ))
                }
            };
            let Some(response) = response else {
                continue;
            };
            let mut out = serde_json::to_string(&response)?;
            out.push('\n');
            writer.write_all(out.as_bytes()).await?;
            writer.flush().await?;
        }
        Ok(())
    }

    pub async fn serve_stdio(&self) -> Result<()> {
        info!("🚀 {} 已启动 (stdio)", SERVER_NAME);
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await?;
        info!("MCP: stdin 已关闭，服务端退出");
        Ok(())
    }
}

fn initialize(params: Option<&Value>) -> InitializeResult {
    let protocol_version = params
        .and_then(|p| p.get("protocolVersion"))
        .and_then(Value::as_str)
        .unwrap_or(PROTOCOL_VERSION)
        .to_string();
    InitializeResult {
        protocol_version,
        capabilities: ServerCapabilities {
            tools: Some(ToolsCapability::default()),
        },
        server_info: Some(PeerInfo {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    }
}

fn parse_call_params(params: Option<Value>) -> std::result::Result<McpToolCallParams, String> {
    let params = params.ok_or_else(|| "Invalid params: missing tool name".to_string())?;
    serde_json::from_value(params).map_err(|e| format!("Invalid params: {}", e))
}

/// 序列化失败时返回 -32603，而不是伪装成成功的 null
fn respond(id: Option<Value>, result: &impl Serialize) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => {
            warn!(error = %e, "MCP: 结果序列化失败");
            JsonRpcResponse::failure(id, INTERNAL_ERROR, format!("Internal error: {}", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::todo::TodoService;
    use crate::todo::store::InMemoryTodoStore;

    fn server() -> McpServer {
        let service = TodoService::new(Arc::new(InMemoryTodoStore::new()));
        McpServer::new(Arc::new(TodoDispatcher::new(service)))
    }

    async fn call(server: &McpServer, message: Value) -> Value {
        let response = server.handle_message(message).await.unwrap();
        serde_json::to_value(response).unwrap()
    }

    #[tokio::test]
    async fn test_initialize_echoes_protocol_version() {
        let s = server();
        let resp = call(
            &s,
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize",
                   "params": {"protocolVersion": "2025-03-26", "capabilities": {},
                              "clientInfo": {"name": "t", "version": "0"}}}),
        )
        .await;
        assert_eq!(resp["id"], 1);
        assert_eq!(resp["result"]["protocolVersion"], "2025-03-26");
        assert_eq!(resp["result"]["serverInfo"]["name"], "todo-mcp-server");
        assert!(resp["result"]["capabilities"]["tools"].is_object());

        let resp = call(
            &s,
            json!({"jsonrpc": "2.0", "id": 2, "method": "initialize"}),
        )
        .await;
        assert_eq!(resp["result"]["protocolVersion"], PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn test_tools_list() {
        let resp = call(
            &server(),
            json!({"jsonrpc": "2.0", "id": "a", "method": "tools/list"}),
        )
        .await;
        let tools = resp["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 6);
        assert_eq!(tools[0]["name"], "create_todo");
        assert!(tools[0]["inputSchema"].is_object());
    }

    #[tokio::test]
    async fn test_tools_call_success_and_error() {
        let s = server();
        let resp = call(
            &s,
            json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call",
                   "params": {"name": "create_todo", "arguments": {"title": "Buy milk"}}}),
        )
        .await;
        assert_eq!(resp["result"]["content"][0]["type"], "text");
        assert!(resp["result"].get("isError").is_none());
        let text = resp["result"]["content"][0]["text"].as_str().unwrap();
        let todo: Value = serde_json::from_str(text).unwrap();
        assert_eq!(todo["title"], "Buy milk");

        let resp = call(
            &s,
            json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call",
                   "params": {"name": "get_todo", "arguments": {"id": "missing"}}}),
        )
        .await;
        assert_eq!(resp["result"]["isError"], true);
        assert_eq!(
            resp["result"]["content"][0]["text"],
            r#"{"error":"Todo not found"}"#
        );

        let resp = call(
            &s,
            json!({"jsonrpc": "2.0", "id": 5, "method": "tools/call",
                   "params": {"name": "launch_rocket"}}),
        )
        .await;
        assert_eq!(resp["result"]["isError"], true);
        assert!(
            resp["result"]["content"][0]["text"]
                .as_str()
                .unwrap()
                .contains("Unknown tool: launch_rocket")
        );
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let s = server();
        let resp = call(
            &s,
            json!({"jsonrpc": "2.0", "id": 6, "method": "resources/list"}),
        )
        .await;
        assert_eq!(resp["error"]["code"], METHOD_NOT_FOUND);

        let resp = call(
            &s,
            json!({"jsonrpc": "2.0", "id": 7, "method": "tools/call", "params": {"arguments": {}}}),
        )
        .await;
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);

        let resp = s.handle_line("{not json").await.unwrap();
        assert_eq!(resp.error.unwrap().code, PARSE_ERROR);
        assert_eq!(resp.id, None);
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let s = server();
        assert!(
            s.handle_message(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_serve_line_protocol() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            "garbage\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n"
        );
        let mut output = Vec::new();
        server().serve(input.as_bytes(), &mut output).await.unwrap();

        let lines: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[0]["result"], json!({}));
        assert_eq!(lines[1]["error"]["code"], PARSE_ERROR);
        assert_eq!(lines[2]["id"], 2);
    }

    #[tokio::test]
    async fn test_serve_survives_invalid_utf8_line() {
        let mut input = Vec::new();
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#);
        input.extend_from_slice(b"\n\xff\xfe garbage\n");
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#);
        input.push(b'\n');

        let mut output = Vec::new();
        server().serve(input.as_slice(), &mut output).await.unwrap();

        let lines: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["error"]["code"], PARSE_ERROR);
        assert_eq!(lines[1]["id"], Value::Null);
        assert_eq!(lines[2]["id"], 2);
        assert_eq!(lines[2]["result"], json!({}));
    }

    #[test]
    fn test_unserializable_result_is_internal_error() {
        use std::collections::HashMap;
        // 非字符串键的 map 无法转换为 JSON 对象
        let bad: HashMap<Vec<u8>, u8> = HashMap::from([(vec![1], 1)]);
        let resp = respond(Some(json!(9)), &bad);
        assert_eq!(resp.error.unwrap().code, INTERNAL_ERROR);
        assert_eq!(resp.id, Some(json!(9)));
        assert!(resp.result.is_none());
    }
}
