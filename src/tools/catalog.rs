//! 工具目录
//!
//! 固定的六个操作及其参数 JSON Schema。目录在运行期不可变，只用于校验和对外发现。

use serde::Serialize;
use serde_json::{Value, json};

/// 目录版本，随工具集合或参数结构变化而递增
pub const CATALOG_VERSION: &str = "1.0.0";

pub const CREATE_TODO: &str = "create_todo";
pub const GET_TODOS: &str = "get_todos";
pub const GET_TODO: &str = "get_todo";
pub const UPDATE_TODO: &str = "update_todo";
pub const DELETE_TODO: &str = "delete_todo";
pub const GET_CURRENT_DATETIME: &str = "get_current_datetime";

/// 单个目录条目
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// 参数的 JSON Schema
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolSpec {
    fn new(name: &str, description: &str, input_schema: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        }
    }

    /// schema 中声明的必填字段
    pub fn required(&self) -> Vec<&str> {
        self.input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

fn priority_schema(description: &str) -> Value {
    json!({
        "type": "string",
        "enum": ["low", "medium", "high", "urgent"],
        "description": description
    })
}

fn id_schema() -> Value {
    json!({
        "type": "string",
        "description": "The ID of the todo item"
    })
}

/// 完整目录，顺序固定
pub fn list_tools() -> Vec<ToolSpec> {
    vec![
        ToolSpec::new(
            CREATE_TODO,
            "Create a new todo item with optional priority (low, medium, high, urgent), due date (ISO 8601 format), and assignee",
            json!({
                "type": "object",
                "properties": {
                    "title": {
                        "type": "string",
                        "description": "The title of the todo item"
                    },
                    "priority": priority_schema("Priority level of the todo (default: medium)"),
                    "dueDate": {
                        "type": "string",
                        "description": "Due date in ISO 8601 format (e.g., 2025-10-15T10:00:00Z)"
                    },
                    "assignee": {
                        "type": "string",
                        "description": "Person assigned to this todo"
                    }
                },
                "required": ["title"]
            }),
        ),
        ToolSpec::new(
            GET_TODOS,
            "Get all todo items, newest first",
            json!({
                "type": "object",
                "properties": {}
            }),
        ),
        ToolSpec::new(
            GET_TODO,
            "Get a single todo item by its ID",
            json!({
                "type": "object",
                "properties": {
                    "id": id_schema()
                },
                "required": ["id"]
            }),
        ),
        ToolSpec::new(
            UPDATE_TODO,
            "Update a todo item with any combination of fields. Omitted fields are left unchanged; pass null for dueDate or assignee to clear them",
            json!({
                "type": "object",
                "properties": {
                    "id": id_schema(),
                    "title": {
                        "type": "string",
                        "description": "The new title of the todo item"
                    },
                    "completed": {
                        "type": "boolean",
                        "description": "The completion status of the todo item"
                    },
                    "priority": priority_schema("Priority level of the todo"),
                    "dueDate": {
                        "type": "string",
                        "description": "Due date in ISO 8601 format"
                    },
                    "assignee": {
                        "type": "string",
                        "description": "Person assigned to this todo"
                    }
                },
                "required": ["id"]
            }),
        ),
        ToolSpec::new(
            DELETE_TODO,
            "Delete a todo item by its ID",
            json!({
                "type": "object",
                "properties": {
                    "id": id_schema()
                },
                "required": ["id"]
            }),
        ),
        ToolSpec::new(
            GET_CURRENT_DATETIME,
            "Get the current date and time in ISO 8601 format, timestamp, timezone, and formatted string",
            json!({
                "type": "object",
                "properties": {}
            }),
        ),
    ]
}

pub fn find_tool(name: &str) -> Option<ToolSpec> {
    list_tools().into_iter().find(|spec| spec.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_six_named_tools() {
        let names: Vec<String> = list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "create_todo",
                "get_todos",
                "get_todo",
                "update_todo",
                "delete_todo",
                "get_current_datetime"
            ]
        );
    }

    #[test]
    fn test_required_fields_match_operations() {
        for spec in list_tools() {
            assert!(!spec.description.is_empty(), "{} has no description", spec.name);
            let expected: Vec<&str> = match spec.name.as_str() {
                CREATE_TODO => vec!["title"],
                GET_TODO | UPDATE_TODO | DELETE_TODO => vec!["id"],
                _ => vec![],
            };
            assert_eq!(spec.required(), expected, "{}", spec.name);
        }
    }

    #[test]
    fn test_priority_enum_is_closed() {
        let spec = find_tool(CREATE_TODO).unwrap();
        let values = &spec.input_schema["properties"]["priority"]["enum"];
        assert_eq!(values, &json!(["low", "medium", "high", "urgent"]));
    }

    #[test]
    fn test_listing_uses_mcp_field_names() {
        let value = serde_json::to_value(find_tool(GET_TODOS).unwrap()).unwrap();
        assert!(value.get("inputSchema").is_some());
        assert!(value.get("input_schema").is_none());
    }
}
