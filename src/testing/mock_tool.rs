//! Mock 工具，用于测试 Agent 的工具调用顺序和容错行为。
//!
//! ```rust
//! use todo_agent::testing::MockTool;
//! use todo_agent::tools::Tool;
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let tool = MockTool::new("get_todos").with_response("[]");
//!
//! let result = tool.execute(json!({})).await.unwrap();
//! assert!(result.success);
//! assert_eq!(result.output, "[]");
//! assert_eq!(tool.call_count(), 1);
//! # }
//! ```

use super::lock;
use crate::error::{Result, TodoError};
use crate::tools::{Tool, ToolResult};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

enum MockToolResponse {
    Success(String),
    Failure(String),
    Fault(String),
}

/// 可脚本化的 Mock Tool。
///
/// 按顺序返回预设结果；队列耗尽后返回 `"mock response"`。
#[derive(Clone)]
pub struct MockTool {
    name: String,
    description: String,
    parameters: Value,
    responses: Arc<Mutex<VecDeque<MockToolResponse>>>,
    calls: Arc<Mutex<Vec<Value>>>,
}

impl MockTool {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: "A mock tool for testing".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {}
            }),
            responses: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn with_parameters(mut self, schema: Value) -> Self {
        self.parameters = schema;
        self
    }

    /// 追加一条成功响应文本
    pub fn with_response(self, text: impl Into<String>) -> Self {
        lock(&self.responses).push_back(MockToolResponse::Success(text.into()));
        self
    }

    /// 追加一条失败结果（工具正常返回，但 `success == false`）
    pub fn with_failure(self, msg: impl Into<String>) -> Self {
        lock(&self.responses).push_back(MockToolResponse::Failure(msg.into()));
        self
    }

    /// 追加一次执行故障（`execute` 返回 `Err`）
    pub fn with_fault(self, msg: impl Into<String>) -> Self {
        lock(&self.responses).push_back(MockToolResponse::Fault(msg.into()));
        self
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn last_args(&self) -> Option<Value> {
        lock(&self.calls).last().cloned()
    }

    pub fn all_calls(&self) -> Vec<Value> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl Tool for MockTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        self.parameters.clone()
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult> {
        lock(&self.calls).push(arguments);

        let response = lock(&self.responses).pop_front();
        match response {
            Some(MockToolResponse::Success(text)) => Ok(ToolResult::success(text)),
            Some(MockToolResponse::Failure(msg)) => Ok(ToolResult::error(msg)),
            Some(MockToolResponse::Fault(msg)) => Err(TodoError::Other(msg)),
            None => Ok(ToolResult::success("mock response".to_string())),
        }
    }
}
