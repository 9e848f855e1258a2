//! 工具调度桥
//!
//! 任意传输层（MCP、REST、对话 Agent）都把 `(工具名, 原始参数)` 交给
//! [`TodoDispatcher::invoke`]，拿回统一的 [`Envelope`]。
//! 这里是跨进程边界前的最后一层，任何错误都不会越过它向外抛出。

use crate::error::Result;
use crate::todo::{Outcome, Todo, TodoService};
use crate::tools::args::{ArgsError, TodoCommand};
use crate::tools::catalog::{self, ToolSpec};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, error, warn};

/// 统一的成功 / 失败响应
///
/// 成功时 `text` 是格式化后的 JSON；失败时是 `{"error": "..."}`。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub text: String,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl Envelope {
    pub fn success(value: &impl Serialize) -> Self {
        match serde_json::to_string_pretty(value) {
            Ok(text) => Self {
                text,
                is_error: false,
            },
            Err(e) => Self::error(format!("Failed to serialize result: {}", e)),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            text: json!({ "error": message.into() }).to_string(),
            is_error: true,
        }
    }

    /// 失败信封中的错误文本
    pub fn error_message(&self) -> Option<String> {
        if !self.is_error {
            return None;
        }
        serde_json::from_str::<Value>(&self.text)
            .ok()
            .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
    }
}

/// 工具调度器：目录查找 + 参数校验 + 调用服务 + 包装结果
#[derive(Clone)]
pub struct TodoDispatcher {
    service: TodoService,
}

impl TodoDispatcher {
    pub fn new(service: TodoService) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &TodoService {
        &self.service
    }

    /// 目录的纯投影
    pub fn list_tools(&self) -> Vec<ToolSpec> {
        catalog::list_tools()
    }

    pub async fn invoke(&self, name: &str, args: Value) -> Envelope {
        debug!(tool = %name, args = %args, "🔧 调用工具");

        let command = match TodoCommand::parse(name, args) {
            Ok(command) => command,
            Err(ArgsError::UnknownTool(name)) => {
                warn!(tool = %name, "未知工具");
                return Envelope::error(format!("Unknown tool: {}", name));
            }
            Err(e) => return Envelope::error(e.message()),
        };

        match self.run(command).await {
            Ok(Outcome::Ok(envelope)) => envelope,
            Ok(Outcome::NotFound) => Envelope::error("Todo not found"),
            Ok(Outcome::Invalid(reason)) => Envelope::error(reason),
            Err(e) => {
                error!(tool = %name, error = %e, "❌ 工具执行失败");
                Envelope::error(e.to_string())
            }
        }
    }

    /// 成功结果直接从类型化值序列化，字段顺序与结构体声明一致
    async fn run(&self, command: TodoCommand) -> Result<Outcome<Envelope>> {
        let svc = &self.service;
        let outcome = match command {
            TodoCommand::CreateTodo(input) => svc.create_todo(input).await?.map(envelope_of),
            TodoCommand::GetTodos => Outcome::Ok(Envelope::success(&svc.get_all_todos().await?)),
            TodoCommand::GetTodo(args) => svc.get_todo_by_id(&args.id).await?.map(envelope_of),
            TodoCommand::UpdateTodo(args) => svc
                .update_todo(&args.id, args.changes)
                .await?
                .map(envelope_of),
            TodoCommand::DeleteTodo(args) => svc.delete_todo(&args.id).await?.map(|todo| {
                Envelope::success(&Deleted {
                    message: "Todo deleted successfully",
                    todo,
                })
            }),
            TodoCommand::GetCurrentDatetime => {
                Outcome::Ok(Envelope::success(&svc.current_datetime()))
            }
        };
        Ok(outcome)
    }
}

/// delete_todo 的成功载荷
#[derive(Serialize)]
struct Deleted {
    message: &'static str,
    todo: Todo,
}

fn envelope_of(todo: Todo) -> Envelope {
    Envelope::success(&todo)
}
