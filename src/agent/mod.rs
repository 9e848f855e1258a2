//! 对话 Agent
//!
//! 把自然语言请求交给模型，模型发起的工具调用按顺序执行并回传结果，
//! 直到模型给出文本回复或请求澄清。

use crate::error::{Result, TodoError};
use async_trait::async_trait;
use serde_json::Value;

mod config;
mod todo_agent;

pub use config::{AgentConfig, DEFAULT_SYSTEM_PROMPT};
pub use todo_agent::{CLARIFICATION_TOOL, TodoAgent};

/// 一轮对话的结局
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// 模型的最终回复
    Answer(String),
    /// 模型需要用户补充信息才能继续
    NeedsClarification(String),
}

impl TurnOutcome {
    pub fn text(&self) -> &str {
        match self {
            TurnOutcome::Answer(text) | TurnOutcome::NeedsClarification(text) => text,
        }
    }
}

#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    fn system_prompt(&self) -> &str;

    /// 处理一条用户输入，对话历史在多轮之间保留
    async fn chat(&mut self, input: &str) -> Result<TurnOutcome>;

    /// 清空对话历史，只保留系统提示词
    fn reset(&mut self);
}

/// 执行过程的观察点，REPL 用它实时打印工具调用
#[async_trait]
pub trait AgentCallback: Send + Sync {
    async fn on_iteration(&self, _agent: &str, _iteration: usize) {}
    async fn on_tool_start(&self, _agent: &str, _tool: &str, _args: &Value) {}
    async fn on_tool_end(&self, _agent: &str, _tool: &str, _success: bool, _output: &str) {}
    async fn on_error(&self, _agent: &str, _err: &TodoError) {}
    async fn on_final_answer(&self, _agent: &str, _outcome: &TurnOutcome) {}
}
