pub mod http;
pub mod local;
pub mod stdio;

use async_trait::async_trait;

use crate::error::Result;
use crate::mcp::types::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

/// MCP 传输层抽象
///
/// 在客户端和服务端之间传递 JSON-RPC 报文，屏蔽子进程管道 / HTTP / 进程内调用的差异。
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// 发送请求并等待响应，请求 ID 由传输层分配
    async fn send(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse>;

    async fn notify(&self, notification: JsonRpcNotification) -> Result<()>;

    async fn close(&self);
}
