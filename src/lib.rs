pub mod agent;
pub mod config;
pub mod error;
pub mod http;
pub mod llm;
pub mod mcp;
pub mod testing;
pub mod todo;
pub mod tools;

pub mod prelude {
    pub use crate::agent::{Agent, AgentConfig, TodoAgent, TurnOutcome};
    pub use crate::config::AppConfig;
    pub use crate::error::{Result, TodoError};
    pub use crate::todo::{Outcome, Priority, Todo, TodoService, open_store};
    pub use crate::tools::{Envelope, TodoDispatcher, Tool, ToolManager, ToolResult};
}
