use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{McpError, Result};
use crate::mcp::server::McpServer;
use crate::mcp::types::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

use super::McpTransport;

/// 进程内传输：报文直接交给同进程的 [`McpServer`]，不经过管道或网络
pub struct LocalTransport {
    server: McpServer,
    next_id: AtomicU64,
}

impl LocalTransport {
    pub fn new(server: McpServer) -> Self {
        Self {
            server,
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl McpTransport for LocalTransport {
    async fn send(&self, mut request: JsonRpcRequest) -> Result<JsonRpcResponse> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        request.id = Some(Value::from(id));
        self.server.handle_request(request).await.ok_or_else(|| {
            McpError::ProtocolError("server returned no response for a request".to_string())
                .into()
        })
    }

    async fn notify(&self, notification: JsonRpcNotification) -> Result<()> {
        let request = JsonRpcRequest::new(notification.method, notification.params);
        self.server.handle_request(request).await;
        Ok(())
    }

    async fn close(&self) {}
}
