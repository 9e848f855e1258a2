use crate::agent::{Agent, AgentCallback, AgentConfig, TurnOutcome};
use crate::error::{AgentError, Result, TodoError};
use crate::llm::LlmClient;
use crate::llm::types::{Message, ToolCall, ToolDefinition};
use crate::tools::{Tool, ToolManager};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 只由 Agent 提供给模型的澄清函数，不属于工具目录
pub const CLARIFICATION_TOOL: &str = "request_clarification";

const NO_RESPONSE: &str = "No response";

fn clarification_definition() -> ToolDefinition {
    ToolDefinition::function(
        CLARIFICATION_TOOL,
        "Ask the user a clarifying question when the request is ambiguous or missing details. Ends the current turn.",
        json!({
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "description": "The question to show the user"
                }
            },
            "required": ["question"]
        }),
    )
}

/// 驱动工具目录的对话 Agent
///
/// 每轮：调用模型 → 按给出的顺序逐个执行工具调用 → 结果作为 `tool` 消息回传 → 再次调用模型，
/// 直到模型给出文本回复、请求澄清，或超过 `max_iterations`。
pub struct TodoAgent {
    config: AgentConfig,
    llm: Arc<dyn LlmClient>,
    tool_manager: ToolManager,
    messages: Vec<Message>,
}

impl TodoAgent {
    pub fn new(config: AgentConfig, llm: Arc<dyn LlmClient>) -> Self {
        let messages = vec![Message::system(config.system_prompt.clone())];
        Self {
            config,
            llm,
            tool_manager: ToolManager::new(),
            messages,
        }
    }

    pub fn add_tool(&mut self, tool: Box<dyn Tool>) {
        self.tool_manager.register(tool);
    }

    pub fn register_tools(&mut self, tools: Vec<Box<dyn Tool>>) {
        self.tool_manager.register_tools(tools);
    }

    pub fn list_tools(&self) -> Vec<&str> {
        self.tool_manager.list_tools()
    }

    /// 当前对话历史（含系统提示词）
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions = self.tool_manager.get_tool_definitions();
        if self.config.enable_clarification {
            definitions.push(clarification_definition());
        }
        definitions
    }

    fn callbacks(&self) -> Vec<Arc<dyn AgentCallback>> {
        self.config.callbacks.clone()
    }

    async fn finish(&self, outcome: TurnOutcome) -> Result<TurnOutcome> {
        for cb in self.callbacks() {
            cb.on_final_answer(&self.config.agent_name, &outcome).await;
        }
        Ok(outcome)
    }

    async fn fail(&self, err: TodoError) -> Result<TurnOutcome> {
        for cb in self.callbacks() {
            cb.on_error(&self.config.agent_name, &err).await;
        }
        Err(err)
    }

    /// 执行一次工具调用，返回回传给模型的内容；任何失败都折叠为错误文本
    async fn run_tool_call(&self, call: &ToolCall) -> String {
        let agent = &self.config.agent_name;
        let name = call.function.name.as_str();

        let arguments = match parse_arguments(name, &call.function.arguments) {
            Ok(arguments) => arguments,
            Err(err) => {
                warn!(tool = %name, error = %err, "模型给出的参数无法解析");
                for cb in self.callbacks() {
                    cb.on_error(agent, &err).await;
                }
                return json!({ "error": err.to_string() }).to_string();
            }
        };

        for cb in self.callbacks() {
            cb.on_tool_start(agent, name, &arguments).await;
        }
        if self.config.verbose {
            info!(tool = %name, args = %arguments, "🔧 调用工具");
        }

        let result = self.tool_manager.execute_tool(name, arguments).await;

        if self.config.verbose {
            info!(tool = %name, success = result.success, "📤 工具返回");
        }
        for cb in self.callbacks() {
            cb.on_tool_end(agent, name, result.success, &result.output)
                .await;
        }
        result.output
    }

    /// 澄清请求结束本轮：为这条及其后尚未执行的调用补齐 `tool` 消息，保持历史合法
    fn close_pending_calls(&mut self, pending: &[ToolCall], question: &str) {
        for (i, call) in pending.iter().enumerate() {
            let content = if i == 0 {
                "Question delivered to the user; waiting for their reply."
            } else {
                "Skipped: waiting for the user's clarification."
            };
            self.messages.push(Message::tool_result(
                call.id.clone(),
                call.function.name.clone(),
                content.to_string(),
            ));
        }
        self.messages.push(Message::assistant(question.to_string()));
    }
}

fn parse_arguments(tool: &str, raw: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(raw).map_err(|e| {
        AgentError::InvalidToolArguments {
            tool: tool.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

fn clarification_question(call: &ToolCall, fallback: Option<&str>) -> String {
    serde_json::from_str::<Value>(&call.function.arguments)
        .ok()
        .and_then(|args| args.get("question").and_then(Value::as_str).map(str::to_string))
        .filter(|q| !q.trim().is_empty())
        .or_else(|| fallback.filter(|f| !f.trim().is_empty()).map(str::to_string))
        .unwrap_or_else(|| "Could you clarify your request?".to_string())
}

#[async_trait]
impl Agent for TodoAgent {
    fn name(&self) -> &str {
        &self.config.agent_name
    }

    fn system_prompt(&self) -> &str {
        &self.config.system_prompt
    }

    async fn chat(&mut self, input: &str) -> Result<TurnOutcome> {
        debug!(agent = %self.config.agent_name, input = %input, "💬 新一轮对话");
        self.messages.push(Message::user(input.to_string()));

        for iteration in 1..=self.config.max_iterations {
            for cb in self.callbacks() {
                cb.on_iteration(&self.config.agent_name, iteration).await;
            }

            let reply = match self
                .llm
                .chat(self.messages.clone(), self.tool_definitions())
                .await
            {
                Ok(reply) => reply,
                Err(e) => return self.fail(e).await,
            };
            let calls = reply.tool_calls.clone().unwrap_or_default();
            let content = reply.content.clone();
            self.messages.push(reply);

            if calls.is_empty() {
                let text = content
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| NO_RESPONSE.to_string());
                return self.finish(TurnOutcome::Answer(text)).await;
            }

            for (i, call) in calls.iter().enumerate() {
                if self.config.enable_clarification && call.function.name == CLARIFICATION_TOOL {
                    let question = clarification_question(call, content.as_deref());
                    info!(agent = %self.config.agent_name, question = %question, "❓ 请求澄清");
                    self.close_pending_calls(&calls[i..], &question);
                    return self.finish(TurnOutcome::NeedsClarification(question)).await;
                }

                let output = self.run_tool_call(call).await;
                self.messages.push(Message::tool_result(
                    call.id.clone(),
                    call.function.name.clone(),
                    output,
                ));
            }
        }

        warn!(
            agent = %self.config.agent_name,
            max = self.config.max_iterations,
            "超过最大迭代次数"
        );
        self.fail(AgentError::MaxIterationsExceeded(self.config.max_iterations).into())
            .await
    }

    fn reset(&mut self) {
        self.messages.truncate(1);
    }
}
