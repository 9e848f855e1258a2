//! 每个工具一个类型化参数结构
//!
//! 原始 JSON 先经过 [`schema::validate`](crate::tools::schema::validate)，
//! 再反序列化为 [`TodoCommand`]。业务层只接触类型化结构。

use crate::todo::{CreateTodoInput, UpdateTodoInput};
use crate::tools::catalog::{
    self, CREATE_TODO, DELETE_TODO, GET_CURRENT_DATETIME, GET_TODO, GET_TODOS, UPDATE_TODO,
};
use crate::tools::schema;
use serde::Deserialize;
use serde_json::{Map, Value};

/// 以 id 定位单条记录的参数
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TodoIdArgs {
    pub id: String,
}

/// update_todo 的参数：目标 id + 部分字段
#[derive(Debug, Clone)]
pub struct UpdateTodoArgs {
    pub id: String,
    pub changes: UpdateTodoInput,
}

/// 目录中六个操作的封闭集合
#[derive(Debug, Clone)]
pub enum TodoCommand {
    CreateTodo(CreateTodoInput),
    GetTodos,
    GetTodo(TodoIdArgs),
    UpdateTodo(UpdateTodoArgs),
    DeleteTodo(TodoIdArgs),
    GetCurrentDatetime,
}

/// 参数解析失败的原因
#[derive(Debug, Clone, PartialEq)]
pub enum ArgsError {
    /// 目录中没有这个工具
    UnknownTool(String),
    /// 参数不满足 schema
    Invalid(String),
}

impl ArgsError {
    pub fn message(&self) -> String {
        match self {
            ArgsError::UnknownTool(name) => format!("Unknown tool: {}", name),
            ArgsError::Invalid(reason) => reason.clone(),
        }
    }
}

impl TodoCommand {
    /// 查目录 → 校验 schema → 反序列化为类型化参数
    pub fn parse(name: &str, raw: Value) -> Result<Self, ArgsError> {
        let spec =
            catalog::find_tool(name).ok_or_else(|| ArgsError::UnknownTool(name.to_string()))?;
        let mut args = schema::validate(&spec.input_schema, raw).map_err(ArgsError::Invalid)?;

        let command = match name {
            CREATE_TODO => TodoCommand::CreateTodo(from_map(args)?),
            GET_TODOS => TodoCommand::GetTodos,
            GET_TODO => TodoCommand::GetTodo(from_map(args)?),
            UPDATE_TODO => {
                let id = take_id(&mut args)?;
                TodoCommand::UpdateTodo(UpdateTodoArgs {
                    id,
                    changes: from_map(args)?,
                })
            }
            DELETE_TODO => TodoCommand::DeleteTodo(from_map(args)?),
            GET_CURRENT_DATETIME => TodoCommand::GetCurrentDatetime,
            other => return Err(ArgsError::UnknownTool(other.to_string())),
        };
        Ok(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            TodoCommand::CreateTodo(_) => CREATE_TODO,
            TodoCommand::GetTodos => GET_TODOS,
            TodoCommand::GetTodo(_) => GET_TODO,
            TodoCommand::UpdateTodo(_) => UPDATE_TODO,
            TodoCommand::DeleteTodo(_) => DELETE_TODO,
            TodoCommand::GetCurrentDatetime => GET_CURRENT_DATETIME,
        }
    }
}

fn from_map<T: for<'de> Deserialize<'de>>(args: Map<String, Value>) -> Result<T, ArgsError> {
    serde_json::from_value(Value::Object(args))
        .map_err(|e| ArgsError::Invalid(format!("Invalid arguments: {}", e)))
}

fn take_id(args: &mut Map<String, Value>) -> Result<String, ArgsError> {
    match args.remove("id") {
        Some(Value::String(id)) => Ok(id),
        _ => Err(ArgsError::Invalid(
            "Missing required parameter: id".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_create() {
        let cmd = TodoCommand::parse(
            CREATE_TODO,
            json!({"title": "Study", "priority": "high", "dueDate": "2025-10-15T18:00:00Z"}),
        )
        .unwrap();
        match cmd {
            TodoCommand::CreateTodo(input) => {
                assert_eq!(input.title.as_deref(), Some("Study"));
                assert_eq!(input.priority.as_deref(), Some("high"));
                assert_eq!(input.due_date.as_deref(), Some("2025-10-15T18:00:00Z"));
                assert_eq!(input.assignee, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_update_keeps_null_distinct_from_absent() {
        let cmd = TodoCommand::parse(UPDATE_TODO, json!({"id": "abc", "dueDate": null})).unwrap();
        let TodoCommand::UpdateTodo(args) = cmd else {
            panic!("expected update");
        };
        assert_eq!(args.id, "abc");
        assert_eq!(args.changes.due_date, Some(None));
        assert_eq!(args.changes.assignee, None);
        assert_eq!(args.changes.title, None);
    }

    #[test]
    fn test_parse_unknown_tool() {
        let err = TodoCommand::parse("launch_rocket", json!({})).unwrap_err();
        assert_eq!(err, ArgsError::UnknownTool("launch_rocket".to_string()));
        assert_eq!(err.message(), "Unknown tool: launch_rocket");
    }

    #[test]
    fn test_parse_missing_id() {
        let err = TodoCommand::parse(DELETE_TODO, json!({})).unwrap_err();
        assert_eq!(
            err,
            ArgsError::Invalid("Missing required parameter: id".to_string())
        );
    }

    #[test]
    fn test_name_round_trips() {
        for spec in catalog::list_tools() {
            let args = match spec.name.as_str() {
                CREATE_TODO => json!({"title": "x"}),
                GET_TODO | UPDATE_TODO | DELETE_TODO => json!({"id": "x"}),
                _ => json!({}),
            };
            let cmd = TodoCommand::parse(&spec.name, args).unwrap();
            assert_eq!(cmd.name(), spec.name);
        }
    }
}
