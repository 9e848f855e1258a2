//! Mock LLM 客户端，用于在不发起真实 HTTP 请求的情况下测试对话 Agent。
//!
//! ```rust
//! use todo_agent::testing::MockLlmClient;
//! use todo_agent::llm::LlmClient;
//! use todo_agent::llm::types::Message;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let mock = MockLlmClient::new()
//!     .with_text("第一次响应")
//!     .with_text("第二次响应");
//!
//! let r1 = mock.chat(vec![Message::user("hi".to_string())], vec![]).await.unwrap();
//! assert_eq!(r1.content.as_deref(), Some("第一次响应"));
//! assert_eq!(mock.call_count(), 1);
//! # }
//! ```

use super::lock;
use crate::error::{LlmError, Result, TodoError};
use crate::llm::LlmClient;
use crate::llm::types::{Message, ToolCall, ToolDefinition};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

enum MockLlmResponse {
    Message(Message),
    Err(TodoError),
}

/// 可脚本化的 Mock LLM 客户端。
///
/// 按顺序返回预设的 assistant 消息；队列耗尽后返回 `EmptyResponse` 错误。
pub struct MockLlmClient {
    responses: Arc<Mutex<VecDeque<MockLlmResponse>>>,
    /// 每次调用时收到的 messages 列表，按顺序记录
    calls: Arc<Mutex<Vec<Vec<Message>>>>,
    /// 每次调用时提供给模型的工具名
    offered_tools: Arc<Mutex<Vec<Vec<String>>>>,
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            offered_tools: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// 追加一条纯文本回复
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_message(Message::assistant(text.into()))
    }

    /// 追加一条要求调用工具的回复
    pub fn with_tool_calls(self, calls: Vec<ToolCall>) -> Self {
        self.with_message(Message::assistant_with_tools(calls))
    }

    pub fn with_message(self, message: Message) -> Self {
        lock(&self.responses).push_back(MockLlmResponse::Message(message));
        self
    }

    /// 追加一条错误响应
    pub fn with_error(self, err: TodoError) -> Self {
        lock(&self.responses).push_back(MockLlmResponse::Err(err));
        self
    }

    pub fn with_network_error(self, msg: impl Into<String>) -> Self {
        self.with_error(TodoError::Llm(LlmError::NetworkError(msg.into())))
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// 最后一次调用时传入的 messages
    pub fn last_messages(&self) -> Option<Vec<Message>> {
        lock(&self.calls).last().cloned()
    }

    pub fn all_calls(&self) -> Vec<Vec<Message>> {
        lock(&self.calls).clone()
    }

    /// 最后一次调用时提供的工具名
    pub fn last_offered_tools(&self) -> Option<Vec<String>> {
        lock(&self.offered_tools).last().cloned()
    }

    /// 剩余未消费的预设响应数量
    pub fn remaining(&self) -> usize {
        lock(&self.responses).len()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn chat(&self, messages: Vec<Message>, tools: Vec<ToolDefinition>) -> Result<Message> {
        lock(&self.calls).push(messages);
        lock(&self.offered_tools).push(tools.into_iter().map(|t| t.function.name).collect());

        match lock(&self.responses).pop_front() {
            Some(MockLlmResponse::Message(message)) => Ok(message),
            Some(MockLlmResponse::Err(e)) => Err(e),
            None => Err(TodoError::Llm(LlmError::EmptyResponse)),
        }
    }
}
