//! Todo 存储层
//!
//! 单条记录、非事务、不重试。任何读写故障都以 [`StoreError`] 上抛。
//!
//! ## 内置实现
//!
//! - [`InMemoryTodoStore`]：进程内存，适合测试
//! - [`FileTodoStore`]：JSON 文件持久化
//!
//! 用 [`open_store`] 按连接串选择实现：
//!
//! ```rust,no_run
//! use todo_agent::todo::store::open_store;
//!
//! # fn example() -> todo_agent::error::Result<()> {
//! let memory = open_store("memory://")?;
//! let file = open_store("file://~/.todo-agent/todos.json")?;
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, StoreError};
use crate::todo::model::{NewTodo, Todo, TodoPatch};
use async_trait::async_trait;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

// ── TodoStore trait ──────────────────────────────────────────────────────────

/// Todo 记录的持久化接口
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// 插入新记录，由存储层分配 id 和时间戳
    async fn insert(&self, fields: NewTodo) -> Result<Todo>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Todo>>;

    /// 全部记录，按创建时间倒序（最新在前）
    async fn find_all(&self) -> Result<Vec<Todo>>;

    /// 合并出现的字段并刷新 `updated_at`；记录不存在返回 `None`
    async fn update_partial(&self, id: &str, patch: TodoPatch) -> Result<Option<Todo>>;

    /// 删除并返回删除前的记录
    async fn delete_by_id(&self, id: &str) -> Result<Option<Todo>>;
}

/// 按连接串打开存储
///
/// - `memory://` → [`InMemoryTodoStore`]
/// - `file://<path>` 或不带 scheme 的路径 → [`FileTodoStore`]
pub fn open_store(url: &str) -> Result<Arc<dyn TodoStore>> {
    if url == "memory://" || url == "memory" {
        info!("🗄️ 使用内存存储");
        return Ok(Arc::new(InMemoryTodoStore::new()));
    }
    if let Some(path) = url.strip_prefix("file://") {
        return Ok(Arc::new(FileTodoStore::new(path)?));
    }
    if url.contains("://") || url.trim().is_empty() {
        return Err(StoreError::UnsupportedUrl(url.to_string()).into());
    }
    Ok(Arc::new(FileTodoStore::new(url)?))
}

// ── TodoTable ────────────────────────────────────────────────────────────────

/// 两种实现共用的记录表，按插入顺序保存
#[derive(Debug, Clone, Default)]
struct TodoTable {
    rows: Vec<Todo>,
}

impl TodoTable {
    fn from_rows(rows: Vec<Todo>) -> Self {
        Self { rows }
    }

    fn insert(&mut self, fields: NewTodo) -> Todo {
        let now = now_millis();
        let todo = Todo {
            id: uuid::Uuid::new_v4().to_string(),
            title: fields.title,
            completed: false,
            priority: fields.priority,
            due_date: fields.due_date,
            assignee: fields.assignee,
            created_at: now,
            updated_at: now,
        };
        self.rows.push(todo.clone());
        todo
    }

    fn get(&self, id: &str) -> Option<Todo> {
        self.rows.iter().find(|t| t.id == id).cloned()
    }

    fn list(&self) -> Vec<Todo> {
        // 先反转再稳定排序：创建时间相同的，后插入的在前
        let mut rows: Vec<Todo> = self.rows.iter().rev().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }

    fn update(&mut self, id: &str, patch: TodoPatch) -> Option<Todo> {
        let todo = self.rows.iter_mut().find(|t| t.id == id)?;
        patch.apply(todo);
        todo.updated_at = next_updated_at(todo.updated_at);
        Some(todo.clone())
    }

    fn remove(&mut self, id: &str) -> Option<Todo> {
        let index = self.rows.iter().position(|t| t.id == id)?;
        Some(self.rows.remove(index))
    }
}

// ── InMemoryTodoStore ────────────────────────────────────────────────────────

/// 进程内存 Store，不持久化
pub struct InMemoryTodoStore {
    table: RwLock<TodoTable>,
}

impl Default for InMemoryTodoStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTodoStore {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(TodoTable::default()),
        }
    }
}

#[async_trait]
impl TodoStore for InMemoryTodoStore {
    async fn insert(&self, fields: NewTodo) -> Result<Todo> {
        Ok(self.table.write().await.insert(fields))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Todo>> {
        Ok(self.table.read().await.get(id))
    }

    async fn find_all(&self) -> Result<Vec<Todo>> {
        Ok(self.table.read().await.list())
    }

    async fn update_partial(&self, id: &str, patch: TodoPatch) -> Result<Option<Todo>> {
        Ok(self.table.write().await.update(id, patch))
    }

    async fn delete_by_id(&self, id: &str) -> Result<Option<Todo>> {
        Ok(self.table.write().await.remove(id))
    }
}

// ── FileTodoStore ────────────────────────────────────────────────────────────

/// 基于 JSON 文件的持久化 Store
///
/// 打开时整体读入，每次写操作后整体回写。文件内容是按插入顺序排列的记录数组。
pub struct FileTodoStore {
    path: PathBuf,
    table: RwLock<TodoTable>,
}

impl FileTodoStore {
    /// 打开或创建存储文件，自动建父目录
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = expand_tilde(path.as_ref());
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::IoError(format!("创建目录失败: {e}")))?;
        }
        let rows: Vec<Todo> = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| StoreError::IoError(format!("读取存储文件失败: {e}")))?;
            if raw.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&raw)
                    .map_err(|e| StoreError::SerializationError(format!("存储文件损坏: {e}")))?
            }
        } else {
            Vec::new()
        };
        info!(path = %path.display(), todos = rows.len(), "🗄️ FileTodoStore 初始化");
        Ok(Self {
            path,
            table: RwLock::new(TodoTable::from_rows(rows)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, table: &TodoTable) -> Result<()> {
        let json = serde_json::to_string_pretty(&table.rows)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| StoreError::IoError(format!("写入存储文件失败: {e}")))?;
        debug!(path = %self.path.display(), "💾 Todo 已持久化");
        Ok(())
    }
}

/// 写操作先作用在表的副本上，写盘成功后才替换内存状态，
/// 因此写盘失败时读者看到的仍是旧数据
#[async_trait]
impl TodoStore for FileTodoStore {
    async fn insert(&self, fields: NewTodo) -> Result<Todo> {
        let mut table = self.table.write().await;
        let mut staged = table.clone();
        let todo = staged.insert(fields);
        self.flush(&staged).await?;
        *table = staged;
        Ok(todo)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Todo>> {
        Ok(self.table.read().await.get(id))
    }

    async fn find_all(&self) -> Result<Vec<Todo>> {
        Ok(self.table.read().await.list())
    }

    async fn update_partial(&self, id: &str, patch: TodoPatch) -> Result<Option<Todo>> {
        let mut table = self.table.write().await;
        let mut staged = table.clone();
        let Some(updated) = staged.update(id, patch) else {
            return Ok(None);
        };
        self.flush(&staged).await?;
        *table = staged;
        Ok(Some(updated))
    }

    async fn delete_by_id(&self, id: &str) -> Result<Option<Todo>> {
        let mut table = self.table.write().await;
        let mut staged = table.clone();
        let Some(removed) = staged.remove(id) else {
            return Ok(None);
        };
        self.flush(&staged).await?;
        *table = staged;
        Ok(Some(removed))
    }
}

// ── 私有工具函数 ──────────────────────────────────────────────────────────────

fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// `updated_at` 必须严格递增，即使两次写入落在同一毫秒
fn next_updated_at(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = now_millis();
    if now > previous {
        now
    } else {
        previous + Duration::milliseconds(1)
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if s.starts_with("~/")
        && let Some(home) = std::env::var("HOME")
            .ok()
            .or_else(|| std::env::var("USERPROFILE").ok())
    {
        return PathBuf::from(home).join(&s[2..]);
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::todo::model::Priority;

    fn fields(title: &str) -> NewTodo {
        NewTodo {
            title: title.to_string(),
            priority: Priority::Medium,
            due_date: None,
            assignee: None,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_unique_ids() -> Result<()> {
        let store = InMemoryTodoStore::new();
        let a = store.insert(fields("a")).await?;
        let b = store.insert(fields("b")).await?;
        assert_ne!(a.id, b.id);
        assert!(!a.completed);
        assert_eq!(a.created_at, a.updated_at);
        Ok(())
    }

    #[tokio::test]
    async fn test_find_all_newest_first() -> Result<()> {
        let store = InMemoryTodoStore::new();
        store.insert(fields("first")).await?;
        store.insert(fields("second")).await?;
        store.insert(fields("third")).await?;

        let titles: Vec<String> = store
            .find_all()
            .await?
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["third", "second", "first"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_refreshes_updated_at() -> Result<()> {
        let store = InMemoryTodoStore::new();
        let todo = store.insert(fields("a")).await?;
        let updated = store
            .update_partial(&todo.id, TodoPatch::default())
            .await?
            .unwrap();
        assert!(updated.updated_at > todo.updated_at);
        assert_eq!(updated.created_at, todo.created_at);
        assert_eq!(updated.title, todo.title);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_ids_yield_none() -> Result<()> {
        let store = InMemoryTodoStore::new();
        assert!(store.find_by_id("nope").await?.is_none());
        assert!(
            store
                .update_partial("nope", TodoPatch::default())
                .await?
                .is_none()
        );
        assert!(store.delete_by_id("nope").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("todos.json");

        let kept_id = {
            let store = FileTodoStore::new(&path)?;
            let kept = store.insert(fields("keep me")).await?;
            let dropped = store.insert(fields("drop me")).await?;
            store.delete_by_id(&dropped.id).await?;
            store
                .update_partial(
                    &kept.id,
                    TodoPatch {
                        completed: Some(true),
                        ..Default::default()
                    },
                )
                .await?;
            kept.id
        };

        let reopened = FileTodoStore::new(&path)?;
        let all = reopened.find_all().await?;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, kept_id);
        assert!(all[0].completed);
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_storage_fault() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("todos.json");
        std::fs::write(&path, "{ not json")?;
        assert!(matches!(
            FileTodoStore::new(&path),
            Err(crate::error::TodoError::Storage(
                StoreError::SerializationError(_)
            ))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_write_leaves_readers_on_old_state() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("todos.json");
        let store = FileTodoStore::new(&path)?;
        let todo = store.insert(fields("stay put")).await?;

        // 数据文件变成目录后，任何写盘都会失败
        std::fs::remove_file(&path)?;
        std::fs::create_dir(&path)?;

        let patch = TodoPatch {
            completed: Some(true),
            ..Default::default()
        };
        assert!(store.update_partial(&todo.id, patch).await.is_err());
        let current = store.find_by_id(&todo.id).await?.unwrap();
        assert!(!current.completed);
        assert_eq!(current.updated_at, todo.updated_at);

        assert!(store.delete_by_id(&todo.id).await.is_err());
        assert!(store.find_by_id(&todo.id).await?.is_some());

        assert!(store.insert(fields("never lands")).await.is_err());
        assert_eq!(store.find_all().await?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_open_store_rejects_unknown_scheme() {
        assert!(open_store("mongodb://localhost/todos").is_err());
        assert!(open_store("memory://").is_ok());
    }
}
