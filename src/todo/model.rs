//! Todo 记录及其输入类型
//!
//! | 类型 | 用途 |
//! |------|------|
//! | [`Todo`] | 持久化记录，字段顺序即对外 JSON 的字段顺序 |
//! | [`CreateTodoInput`] / [`UpdateTodoInput`] | 前端传入的原始输入（未校验） |
//! | [`NewTodo`] / [`TodoPatch`] | 校验后交给存储层的字段 |
//! | [`Outcome`] | 区分 成功 / 不存在 / 参数非法 的业务结果 |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// 优先级，取值封闭
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| {
                format!(
                    "Invalid priority: '{}' (expected one of: low, medium, high, urgent)",
                    s
                )
            })
    }
}

/// 持久化的待办记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    pub title: String,
    pub completed: bool,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub assignee: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 创建请求的原始输入
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
}

impl CreateTodoInput {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }
}

/// 部分更新的原始输入
///
/// `due_date` / `assignee` 用双层 Option：外层 `None` 表示字段缺省（不修改），
/// `Some(None)` 表示显式传了 `null`（清空）。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodoInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub assignee: Option<Option<String>>,
}

/// 字段出现即为 `Some(..)`，哪怕值是 `null`
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// 已校验、待插入的字段
#[derive(Debug, Clone, PartialEq)]
pub struct NewTodo {
    pub title: String,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub assignee: Option<String>,
}

/// 已校验的部分更新
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub assignee: Option<Option<String>>,
}

impl TodoPatch {
    /// 只覆盖出现的字段，`updated_at` 由存储层维护
    pub fn apply(self, todo: &mut Todo) {
        if let Some(title) = self.title {
            todo.title = title;
        }
        if let Some(completed) = self.completed {
            todo.completed = completed;
        }
        if let Some(priority) = self.priority {
            todo.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            todo.due_date = due_date;
        }
        if let Some(assignee) = self.assignee {
            todo.assignee = assignee;
        }
    }
}

/// 业务结果：成功、记录不存在、输入非法
///
/// 存储故障不在这里，走 `Result` 的 `Err` 分支。
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ok(T),
    NotFound,
    Invalid(String),
}

impl<T> Outcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Ok(v) => Outcome::Ok(f(v)),
            Outcome::NotFound => Outcome::NotFound,
            Outcome::Invalid(reason) => Outcome::Invalid(reason),
        }
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Outcome::Ok(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Outcome::NotFound)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Outcome::Invalid(_))
    }
}

impl<T> From<Option<T>> for Outcome<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Outcome::NotFound, Outcome::Ok)
    }
}

/// 当前时间信息
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateTimeInfo {
    /// ISO-8601 UTC，毫秒精度
    pub datetime: String,
    /// Unix 毫秒
    pub timestamp: i64,
    /// IANA 时区名
    pub timezone: String,
    /// 本地时间的可读形式
    pub formatted: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_priority_parse_is_case_insensitive() {
        assert_eq!("HIGH".parse::<Priority>(), Ok(Priority::High));
        assert_eq!(" urgent ".parse::<Priority>(), Ok(Priority::Urgent));
        assert!("critical".parse::<Priority>().is_err());
    }

    #[test]
    fn test_update_input_distinguishes_null_from_absent() {
        let absent: UpdateTodoInput = serde_json::from_value(json!({})).unwrap();
        assert_eq!(absent.due_date, None);

        let cleared: UpdateTodoInput = serde_json::from_value(json!({"dueDate": null})).unwrap();
        assert_eq!(cleared.due_date, Some(None));

        let set: UpdateTodoInput =
            serde_json::from_value(json!({"dueDate": "2025-10-15T18:00:00Z"})).unwrap();
        assert_eq!(set.due_date, Some(Some("2025-10-15T18:00:00Z".to_string())));
    }

    #[test]
    fn test_todo_serializes_in_declared_field_order() {
        let now = Utc::now();
        let todo = Todo {
            id: "abc".to_string(),
            title: "Buy milk".to_string(),
            completed: false,
            priority: Priority::Medium,
            due_date: None,
            assignee: None,
            created_at: now,
            updated_at: now,
        };
        let text = serde_json::to_string(&todo).unwrap();
        let keys = [
            "\"id\"",
            "\"title\"",
            "\"completed\"",
            "\"priority\"",
            "\"dueDate\"",
            "\"assignee\"",
            "\"createdAt\"",
            "\"updatedAt\"",
        ];
        let positions: Vec<usize> = keys.iter().map(|k| text.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{}", text);
        assert!(text.contains("\"priority\":\"medium\""));
    }

    #[test]
    fn test_patch_only_touches_present_fields() {
        let now = Utc::now();
        let mut todo = Todo {
            id: "abc".to_string(),
            title: "Study".to_string(),
            completed: false,
            priority: Priority::High,
            due_date: Some(now),
            assignee: Some("Student".to_string()),
            created_at: now,
            updated_at: now,
        };
        TodoPatch {
            completed: Some(true),
            assignee: Some(None),
            ..Default::default()
        }
        .apply(&mut todo);

        assert!(todo.completed);
        assert_eq!(todo.title, "Study");
        assert_eq!(todo.priority, Priority::High);
        assert_eq!(todo.due_date, Some(now));
        assert_eq!(todo.assignee, None);
    }
}
