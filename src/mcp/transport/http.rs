use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{McpError, Result};
use crate::mcp::types::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

use super::McpTransport;

/// HTTP 传输层
///
/// 每个 JSON-RPC 报文一次 `POST {base_url}/message`，与 `serve` 子命令挂载的
/// `/mcp/message` 端点对应，因此 `base_url` 形如 `http://host:3000/mcp`。
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    headers: HashMap<String, String>,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(base_url: String, headers: HashMap<String, String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            headers,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/message", self.base_url.trim_end_matches('/'))
    }

    fn post(&self, body: &impl Serialize) -> RequestBuilder {
        self.headers.iter().fold(
            self.client.post(self.endpoint()).json(body),
            |builder, (k, v)| builder.header(k, v),
        )
    }
}

#[async_trait]
impl McpTransport for HttpTransport {
    async fn send(&self, mut request: JsonRpcRequest) -> Result<JsonRpcResponse> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        request.id = Some(Value::from(id));
        debug!(method = %request.method, id, endpoint = %self.endpoint(), "MCP http: 发送请求");

        let response = self
            .post(&request)
            .send()
            .await
            .map_err(|e| McpError::ConnectionFailed(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(McpError::ConnectionFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            ))
            .into());
        }

        response.json::<JsonRpcResponse>().await.map_err(|e| {
            McpError::ProtocolError(format!("Invalid JSON-RPC response: {}", e)).into()
        })
    }

    async fn notify(&self, notification: JsonRpcNotification) -> Result<()> {
        if let Err(e) = self.post(&notification).send().await {
            warn!(method = %notification.method, error = %e, "MCP http: 通知发送失败");
        }
        Ok(())
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_appends_message() {
        let t = HttpTransport::new("http://localhost:3000/mcp/".to_string(), HashMap::new());
        assert_eq!(t.endpoint(), "http://localhost:3000/mcp/message");
    }
}
