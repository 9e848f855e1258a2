//! Todo 生命周期服务
//!
//! 所有前端（REST、MCP、对话 Agent）共用同一个 [`TodoService`]，
//! 默认值、部分更新、字段校验只在这里实现一次。

use crate::error::Result;
use crate::todo::model::{
    CreateTodoInput, DateTimeInfo, NewTodo, Outcome, Priority, Todo, TodoPatch, UpdateTodoInput,
};
use crate::todo::store::TodoStore;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// 业务规则层，持有共享的存储句柄，克隆成本很低
#[derive(Clone)]
pub struct TodoService {
    store: Arc<dyn TodoStore>,
}

impl TodoService {
    pub fn new(store: Arc<dyn TodoStore>) -> Self {
        Self { store }
    }

    pub async fn create_todo(&self, input: CreateTodoInput) -> Result<Outcome<Todo>> {
        let fields = match validate_create(input) {
            Ok(fields) => fields,
            Err(reason) => return Ok(Outcome::Invalid(reason)),
        };
        let todo = self.store.insert(fields).await?;
        info!(id = %todo.id, priority = %todo.priority, "📝 创建 todo");
        Ok(Outcome::Ok(todo))
    }

    pub async fn get_all_todos(&self) -> Result<Vec<Todo>> {
        let todos = self.store.find_all().await?;
        debug!(count = todos.len(), "📋 列出 todo");
        Ok(todos)
    }

    pub async fn get_todo_by_id(&self, id: &str) -> Result<Outcome<Todo>> {
        Ok(self.store.find_by_id(id).await?.into())
    }

    pub async fn update_todo(&self, id: &str, input: UpdateTodoInput) -> Result<Outcome<Todo>> {
        let patch = match validate_update(input) {
            Ok(patch) => patch,
            Err(reason) => return Ok(Outcome::Invalid(reason)),
        };
        let updated = self.store.update_partial(id, patch).await?;
        if let Some(todo) = &updated {
            info!(id = %todo.id, "✏️ 更新 todo");
        }
        Ok(updated.into())
    }

    pub async fn delete_todo(&self, id: &str) -> Result<Outcome<Todo>> {
        let removed = self.store.delete_by_id(id).await?;
        if let Some(todo) = &removed {
            info!(id = %todo.id, "🗑️ 删除 todo");
        }
        Ok(removed.into())
    }

    /// 只依赖进程时钟，无副作用
    pub fn current_datetime(&self) -> DateTimeInfo {
        datetime_info(Utc::now())
    }
}

fn validate_create(input: CreateTodoInput) -> std::result::Result<NewTodo, String> {
    let title = parse_title(input.title.as_deref())?;
    let priority = match input.priority.as_deref() {
        Some(raw) => raw.parse::<Priority>()?,
        None => Priority::default(),
    };
    let due_date = match input.due_date.as_deref() {
        Some(raw) if !raw.trim().is_empty() => Some(parse_due_date(raw)?),
        _ => None,
    };
    Ok(NewTodo {
        title,
        priority,
        due_date,
        assignee: normalize_assignee(input.assignee),
    })
}

fn validate_update(input: UpdateTodoInput) -> std::result::Result<TodoPatch, String> {
    let title = match input.title.as_deref() {
        Some(raw) => Some(parse_title(Some(raw))?),
        None => None,
    };
    let priority = match input.priority.as_deref() {
        Some(raw) => Some(raw.parse::<Priority>()?),
        None => None,
    };
    let due_date = match input.due_date {
        None => None,
        Some(None) => Some(None),
        Some(Some(raw)) if raw.trim().is_empty() => Some(None),
        Some(Some(raw)) => Some(Some(parse_due_date(&raw)?)),
    };
    Ok(TodoPatch {
        title,
        completed: input.completed,
        priority,
        due_date,
        assignee: input.assignee.map(normalize_assignee),
    })
}

fn parse_title(raw: Option<&str>) -> std::result::Result<String, String> {
    match raw.map(str::trim) {
        Some(title) if !title.is_empty() => Ok(title.to_string()),
        _ => Err("Title is required".to_string()),
    }
}

fn normalize_assignee(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// 接受 RFC 3339、无时区的 `YYYY-MM-DDTHH:MM:SS`（按 UTC）和纯日期（UTC 零点）
pub fn parse_due_date(raw: &str) -> std::result::Result<DateTime<Utc>, String> {
    let text = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        && let Some(midnight) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(midnight.and_utc());
    }
    Err(format!(
        "Invalid due date: '{}' (expected ISO 8601, e.g. 2025-10-15T10:00:00Z)",
        raw
    ))
}

fn datetime_info(now: DateTime<Utc>) -> DateTimeInfo {
    DateTimeInfo {
        datetime: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        timestamp: now.timestamp_millis(),
        timezone: iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string()),
        formatted: now
            .with_timezone(&Local)
            .format("%-m/%-d/%Y, %-I:%M:%S %p")
            .to_string(),
    }
}
