//! 总是失败的存储实现

use crate::error::{Result, StoreError, TodoError};
use crate::todo::model::{NewTodo, Todo, TodoPatch};
use crate::todo::store::TodoStore;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 每个操作都返回 [`StoreError::IoError`]，并统计被调用的次数
pub struct FailingTodoStore {
    message: String,
    calls: AtomicUsize,
}

impl FailingTodoStore {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// 存储层被触达的次数
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TodoError::Storage(StoreError::IoError(self.message.clone())))
    }
}

#[async_trait]
impl TodoStore for FailingTodoStore {
    async fn insert(&self, _fields: NewTodo) -> Result<Todo> {
        self.fail()
    }

    async fn find_by_id(&self, _id: &str) -> Result<Option<Todo>> {
        self.fail()
    }

    async fn find_all(&self) -> Result<Vec<Todo>> {
        self.fail()
    }

    async fn update_partial(&self, _id: &str, _patch: TodoPatch) -> Result<Option<Todo>> {
        self.fail()
    }

    async fn delete_by_id(&self, _id: &str) -> Result<Option<Todo>> {
        self.fail()
    }
}
