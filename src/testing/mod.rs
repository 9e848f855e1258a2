//! 测试基础设施
//!
//! 在不依赖真实 LLM / 外部服务的情况下测试 todo-agent 各组件。
//!
//! | 类型 | 用途 |
//! |------|------|
//! | [`MockLlmClient`] | 替代真实 LLM，按脚本返回 assistant 消息（文本或工具调用） |
//! | [`MockTool`] | 替代真实工具，用于测试 Agent 的工具调用顺序和容错 |
//! | [`FailingTodoStore`] | 每个操作都返回存储故障，用于测试故障路径 |
//!
//! 所有 Mock 都完全在内存中运行，内部使用 `Arc<Mutex<_>>`，可在多任务测试中共享。
//!
//! # 使用示例
//!
//! ```rust
//! use todo_agent::testing::MockLlmClient;
//! use todo_agent::llm::LlmClient;
//! use todo_agent::llm::types::{Message, ToolCall};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let mock = MockLlmClient::new()
//!     .with_tool_calls(vec![ToolCall::function("call_1", "get_todos", "{}")])
//!     .with_text("You have no todos.");
//!
//! let first = mock.chat(vec![Message::user("list".to_string())], vec![]).await.unwrap();
//! assert!(first.tool_calls.is_some());
//! assert_eq!(mock.call_count(), 1);
//! # }
//! ```

mod failing_store;
mod mock_llm;
mod mock_tool;

pub use failing_store::FailingTodoStore;
pub use mock_llm::MockLlmClient;
pub use mock_tool::MockTool;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// 忽略中毒标记：测试断言失败不应连带后续调用一起 panic
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
