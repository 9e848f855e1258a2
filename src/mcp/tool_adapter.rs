use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::mcp::client::McpClient;
use crate::mcp::types::McpTool;
use crate::tools::{Tool, ToolResult};

/// 把远端 MCP 工具适配为本地 [`Tool`]，使对话 Agent 可以不区分来源地调用
pub struct McpToolAdapter {
    client: Arc<McpClient>,
    tool: McpTool,
}

impl McpToolAdapter {
    pub fn new(client: Arc<McpClient>, tool: McpTool) -> Self {
        Self { client, tool }
    }
}

#[async_trait]
impl Tool for McpToolAdapter {
    fn name(&self) -> &str {
        &self.tool.name
    }

    fn description(&self) -> &str {
        self.tool.description.as_deref().unwrap_or("")
    }

    fn parameters(&self) -> Value {
        self.tool.input_schema.clone()
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult> {
        let result = self.client.call_tool(&self.tool.name, arguments).await?;
        let text = result.text();
        if result.is_error {
            Ok(ToolResult::error(text))
        } else {
            Ok(ToolResult::success(text))
        }
    }
}
