//! MCP（Model Context Protocol）
//!
//! - [`server`]：把 todo 工具目录暴露给任意 MCP 客户端（stdio / HTTP）
//! - [`client`] + [`transport`]：对话 Agent 连接本地子进程或远端服务端
//!
//! ```rust,no_run
//! use todo_agent::mcp::{McpClient, McpServerConfig};
//!
//! # async fn example() -> todo_agent::error::Result<()> {
//! let client = McpClient::new(McpServerConfig::stdio("todo", "todo-agent", vec!["mcp"])).await?;
//! let tools = client.adapted_tools();
//! assert_eq!(tools.len(), 6);
//! client.close().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod server;
pub mod server_config;
pub(crate) mod tool_adapter;
pub mod transport;
pub mod types;

pub use client::McpClient;
pub use server::McpServer;
pub use server_config::{McpServerConfig, TransportConfig};
pub use tool_adapter::McpToolAdapter;
pub use types::{McpContent, McpTool, McpToolCallResult};
