//! 工具系统
//!
//! - [`catalog`]：六个 todo 操作的静态目录
//! - [`schema`] / [`args`]：原始参数 → 类型化参数
//! - [`dispatch`]：统一的调度桥 [`TodoDispatcher`]
//!
//! 对话 Agent 通过 [`Tool`] trait 和 [`ToolManager`] 使用工具。工具可以来自进程内的
//! 调度器（[`DispatchTool`]），也可以来自远端 MCP 服务端（`mcp::McpToolAdapter`）。

pub mod args;
pub mod catalog;
pub mod dispatch;
pub mod schema;

pub use catalog::{ToolSpec, list_tools};
pub use dispatch::{Envelope, TodoDispatcher};

use crate::error::Result;
use crate::llm::types::ToolDefinition;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// 工具执行结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
}

impl ToolResult {
    pub fn success(output: String) -> Self {
        Self {
            success: true,
            output,
        }
    }

    pub fn error(output: String) -> Self {
        Self {
            success: false,
            output,
        }
    }
}

impl From<Envelope> for ToolResult {
    fn from(envelope: Envelope) -> Self {
        Self {
            success: !envelope.is_error,
            output: envelope.text,
        }
    }
}

/// 工具接口，进程内工具和 MCP 远端工具都实现此 trait
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// 工具参数的 JSON Schema 定义
    fn parameters(&self) -> Value;
    async fn execute(&self, arguments: Value) -> Result<ToolResult>;
}

/// 进程内工具：把一个目录条目绑定到共享的调度器
pub struct DispatchTool {
    spec: ToolSpec,
    dispatcher: Arc<TodoDispatcher>,
}

impl DispatchTool {
    pub fn new(spec: ToolSpec, dispatcher: Arc<TodoDispatcher>) -> Self {
        Self { spec, dispatcher }
    }

    /// 为目录中的每个条目生成一个工具
    pub fn all(dispatcher: Arc<TodoDispatcher>) -> Vec<Box<dyn Tool>> {
        dispatcher
            .list_tools()
            .into_iter()
            .map(|spec| Box::new(DispatchTool::new(spec, dispatcher.clone())) as Box<dyn Tool>)
            .collect()
    }
}

#[async_trait::async_trait]
impl Tool for DispatchTool {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn description(&self) -> &str {
        &self.spec.description
    }

    fn parameters(&self) -> Value {
        self.spec.input_schema.clone()
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult> {
        Ok(self.dispatcher.invoke(&self.spec.name, arguments).await.into())
    }
}

/// 工具注册表，保持注册顺序
#[derive(Default)]
pub struct ToolManager {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolManager {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// 同名工具后注册的覆盖先注册的
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    pub fn register_tools(&mut self, tools: Vec<Box<dyn Tool>>) {
        for tool in tools {
            self.register(tool);
        }
    }

    pub fn list_tools(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    pub fn get_tool(&self, tool_name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|tool| tool.name() == tool_name)
            .map(|tool| &**tool)
    }

    pub fn get_tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|tool| ToolDefinition::from_tool(&**tool))
            .collect()
    }

    /// 执行工具；未知工具和执行故障都折叠为失败结果，不中断调用方
    pub async fn execute_tool(&self, tool_name: &str, arguments: Value) -> ToolResult {
        let Some(tool) = self.get_tool(tool_name) else {
            warn!(tool = %tool_name, "未注册的工具");
            return Envelope::error(format!("Unknown tool: {}", tool_name)).into();
        };
        match tool.execute(arguments).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = %tool_name, error = %e, "工具执行失败");
                Envelope::error(e.to_string()).into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::todo::TodoService;
    use crate::todo::store::InMemoryTodoStore;
    use serde_json::json;

    fn manager() -> ToolManager {
        let dispatcher = Arc::new(TodoDispatcher::new(TodoService::new(Arc::new(
            InMemoryTodoStore::new(),
        ))));
        let mut manager = ToolManager::new();
        manager.register_tools(DispatchTool::all(dispatcher));
        manager
    }

    #[test]
    fn test_definitions_follow_catalog() {
        let manager = manager();
        assert_eq!(
            manager.list_tools(),
            list_tools()
                .iter()
                .map(|t| t.name.as_str())
                .collect::<Vec<_>>()
        );
        let defs = manager.get_tool_definitions();
        assert_eq!(defs.len(), 6);
        assert_eq!(defs[0].tool_type, "function");
        assert_eq!(defs[0].function.name, "create_todo");
    }

    #[tokio::test]
    async fn test_execute_routes_through_dispatcher() {
        let manager = manager();
        let created = manager
            .execute_tool("create_todo", json!({"title": "Buy milk"}))
            .await;
        assert!(created.success, "{}", created.output);

        let listed = manager.execute_tool("get_todos", json!({})).await;
        let todos: Vec<Value> = serde_json::from_str(&listed.output).unwrap();
        assert_eq!(todos.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_a_failed_result() {
        let result = manager().execute_tool("nope", json!({})).await;
        assert!(!result.success);
        assert!(result.output.contains("Unknown tool: nope"));
    }
}
