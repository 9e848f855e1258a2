//! Agent 配置

use crate::agent::AgentCallback;
use std::sync::Arc;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant that manages the user's todo list. \
Use the provided tools to create, list, inspect, update and delete todos. \
Call get_current_datetime before resolving relative dates such as \"tomorrow\" or \"next Friday\", \
and always send due dates in ISO 8601 format. \
When a request is ambiguous (for example several todos match), call request_clarification \
with a short question instead of guessing.";

/// Agent 运行时配置
///
/// 通过构建器链式调用设置各项参数，再传入 [`TodoAgent::new`](crate::agent::TodoAgent::new)。
pub struct AgentConfig {
    pub(crate) agent_name: String,
    pub(crate) system_prompt: String,
    /// 单轮对话内最多调用模型的次数，防止死循环
    pub(crate) max_iterations: usize,
    pub(crate) verbose: bool,
    /// 是否向模型提供 `request_clarification`
    pub(crate) enable_clarification: bool,
    pub callbacks: Vec<Arc<dyn AgentCallback>>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::new("todo_agent", DEFAULT_SYSTEM_PROMPT)
    }
}

impl AgentConfig {
    pub fn new(agent_name: &str, system_prompt: &str) -> Self {
        Self {
            agent_name: agent_name.to_string(),
            system_prompt: system_prompt.to_string(),
            max_iterations: 10,
            verbose: false,
            enable_clarification: true,
            callbacks: Vec::new(),
        }
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn enable_clarification(mut self, enabled: bool) -> Self {
        self.enable_clarification = enabled;
        self
    }

    pub fn system_prompt(mut self, system_prompt: &str) -> Self {
        self.system_prompt = system_prompt.to_string();
        self
    }

    pub fn with_callback(mut self, callback: Arc<dyn AgentCallback>) -> Self {
        self.callbacks.push(callback);
        self
    }
}
