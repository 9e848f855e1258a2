use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::error::{McpError, Result};
use crate::mcp::server_config::{McpServerConfig, TransportConfig};
use crate::mcp::tool_adapter::McpToolAdapter;
use crate::mcp::transport::McpTransport;
use crate::mcp::transport::http::HttpTransport;
use crate::mcp::transport::stdio::StdioTransport;
use crate::mcp::types::{
    InitializeParams, InitializeResult, JsonRpcNotification, JsonRpcRequest, McpTool,
    McpToolCallParams, McpToolCallResult, McpToolsListResult, PROTOCOL_VERSION, PeerInfo,
};
use crate::tools::Tool;

/// MCP 客户端
///
/// 连接 → initialize 握手 → initialized 通知 → tools/list 发现 → tools/call 调用。
pub struct McpClient {
    transport: Arc<dyn McpTransport>,
    server_name: String,
    tools: Vec<McpTool>,
}

impl McpClient {
    /// 按配置建立传输层并完成握手和工具发现
    pub async fn new(config: McpServerConfig) -> Result<Arc<Self>> {
        let transport: Arc<dyn McpTransport> = match config.transport {
            TransportConfig::Stdio { command, args, env } => {
                Arc::new(StdioTransport::new(&command, &args, &env).await?)
            }
            TransportConfig::Http { base_url, headers } => {
                Arc::new(HttpTransport::new(base_url, headers))
            }
        };
        Self::connect(config.name, transport).await
    }

    /// 在已有传输层上完成握手和工具发现
    pub async fn connect(
        server_name: impl Into<String>,
        transport: Arc<dyn McpTransport>,
    ) -> Result<Arc<Self>> {
        let server_name = server_name.into();
        info!(server = %server_name, "MCP: 正在连接服务端");

        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: json!({}),
            client_info: PeerInfo {
                name: "todo-agent".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        let response = transport
            .send(JsonRpcRequest::new(
                "initialize",
                Some(serde_json::to_value(params)?),
            ))
            .await?;
        if let Some(err) = response.error {
            return Err(McpError::InitializationFailed(err.message).into());
        }
        let result: InitializeResult = serde_json::from_value(response.result.ok_or_else(
            || McpError::InitializationFailed("empty initialize result".to_string()),
        )?)?;
        info!(
            server = %server_name,
            protocol = %result.protocol_version,
            peer = result.server_info.as_ref().map(|i| i.name.as_str()).unwrap_or("?"),
            "MCP: 握手完成"
        );

        transport
            .notify(JsonRpcNotification::new("notifications/initialized", None))
            .await?;

        let tools = Self::fetch_tools(transport.as_ref(), &server_name).await?;
        info!(server = %server_name, count = tools.len(), "MCP: 发现工具");
        for tool in &tools {
            debug!(tool = %tool.name, "MCP: 可用工具");
        }

        Ok(Arc::new(Self {
            transport,
            server_name,
            tools,
        }))
    }

    /// tools/list，跟随 `nextCursor` 直到取完
    async fn fetch_tools(transport: &dyn McpTransport, server_name: &str) -> Result<Vec<McpTool>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
            let response = transport
                .send(JsonRpcRequest::new("tools/list", params))
                .await?;
            if let Some(err) = response.error {
                warn!(server = %server_name, error = %err.message, "MCP: tools/list 失败");
                break;
            }

            let page: McpToolsListResult =
                serde_json::from_value(response.result.unwrap_or(Value::Null))?;
            tools.extend(page.tools);
            cursor = page.next_cursor;
            if cursor.is_none() {
                break;
            }
        }
        Ok(tools)
    }

    /// 工具本身的失败在 `isError` 中返回；只有协议 / 传输错误才是 `Err`
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<McpToolCallResult> {
        let params = McpToolCallParams {
            name: name.to_string(),
            arguments: Some(arguments),
        };
        let response = self
            .transport
            .send(JsonRpcRequest::new(
                "tools/call",
                Some(serde_json::to_value(params)?),
            ))
            .await?;

        if let Some(err) = response.error {
            return Err(McpError::ToolCallFailed(format!(
                "{} ({}): {}",
                name, err.code, err.message
            ))
            .into());
        }
        Ok(serde_json::from_value(
            response.result.unwrap_or(Value::Null),
        )?)
    }

    pub fn tools(&self) -> &[McpTool] {
        &self.tools
    }

    /// 所有远端工具，适配为本地 [`Tool`]
    pub fn adapted_tools(self: &Arc<Self>) -> Vec<Box<dyn Tool>> {
        self.tools
            .iter()
            .map(|tool| Box::new(McpToolAdapter::new(self.clone(), tool.clone())) as Box<dyn Tool>)
            .collect()
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// stdio 传输会终止子进程
    pub async fn close(&self) {
        info!(server = %self.server_name, "MCP: 关闭连接");
        self.transport.close().await;
    }
}
