//! Todo 领域层：数据模型、存储接口、生命周期服务

pub mod model;
pub mod service;
pub mod store;

pub use model::{
    CreateTodoInput, DateTimeInfo, NewTodo, Outcome, Priority, Todo, TodoPatch, UpdateTodoInput,
};
pub use service::TodoService;
pub use store::{FileTodoStore, InMemoryTodoStore, TodoStore, open_store};
