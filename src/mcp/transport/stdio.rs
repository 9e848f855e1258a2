use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, warn};

use crate::error::{McpError, Result};
use crate::mcp::types::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

use super::McpTransport;

/// 请求 ID → 等待响应的一次性通道
type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;

/// stdio 传输层
///
/// 启动服务端子进程，stdin 写请求、stdout 读响应，每条报文一行。
/// 后台任务按 `id` 把响应路由给等待方；子进程的 stderr 直接继承，日志不会混入协议通道。
pub struct StdioTransport {
    stdin: Mutex<ChildStdin>,
    pending: PendingMap,
    closed: Arc<AtomicBool>,
    next_id: AtomicU64,
    child: Mutex<Child>,
}

impl StdioTransport {
    pub async fn new(command: &str, args: &[String], env: &[(String, String)]) -> Result<Self> {
        let mut child = Command::new(command)
            .args(args)
            .envs(env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                McpError::ConnectionFailed(format!("cannot start '{}': {}", command, e))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::ConnectionFailed("child stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::ConnectionFailed("child stdout unavailable".to_string()))?;

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));
        tokio::spawn(route_responses(stdout, pending.clone(), closed.clone()));

        Ok(Self {
            stdin: Mutex::new(stdin),
            pending,
            closed,
            next_id: AtomicU64::new(1),
            child: Mutex::new(child),
        })
    }

    async fn write_line(&self, message: &impl Serialize) -> Result<()> {
        let mut line = serde_json::to_string(message)
            .map_err(|e| McpError::ProtocolError(e.to_string()))?;
        line.push('\n');

        let mut stdin = self.stdin.lock().await;
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| McpError::ProtocolError(format!("write to server failed: {}", e)))?;
        stdin
            .flush()
            .await
            .map_err(|e| McpError::ProtocolError(format!("flush to server failed: {}", e)))?;
        Ok(())
    }
}

/// 读取子进程 stdout，把带 id 的响应交给对应的等待方
///
/// stdout 关闭时先置 `closed` 再清空等待表，所有等待方随即收到 `TransportClosed`。
async fn route_responses(stdout: ChildStdout, pending: PendingMap, closed: Arc<AtomicBool>) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("MCP stdio: 服务端 stdout 已关闭");
                break;
            }
            Err(e) => {
                warn!(error = %e, "MCP stdio: 读取服务端输出失败");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let message: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, line = %line, "MCP stdio: 非 JSON 输出");
                continue;
            }
        };
        let Some(id) = message.get("id").and_then(Value::as_u64) else {
            let method = message.get("method").and_then(Value::as_str).unwrap_or("?");
            debug!(method = %method, "MCP stdio: 忽略服务端通知");
            continue;
        };
        match serde_json::from_value::<JsonRpcResponse>(message) {
            Ok(response) => {
                if let Some(tx) = pending.lock().await.remove(&id) {
                    let _ = tx.send(response);
                }
            }
            Err(e) => warn!(id, error = %e, "MCP stdio: 响应格式无效"),
        }
    }
    closed.store(true, Ordering::SeqCst);
    pending.lock().await.clear();
}

#[async_trait]
impl McpTransport for StdioTransport {
    async fn send(&self, mut request: JsonRpcRequest) -> Result<JsonRpcResponse> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        request.id = Some(Value::from(id));

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);
        if self.closed.load(Ordering::SeqCst) {
            self.pending.lock().await.remove(&id);
            return Err(McpError::TransportClosed.into());
        }

        if let Err(e) = self.write_line(&request).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        rx.await.map_err(|_| McpError::TransportClosed.into())
    }

    async fn notify(&self, notification: JsonRpcNotification) -> Result<()> {
        self.write_line(&notification).await
    }

    async fn close(&self) {
        if let Err(e) = self.child.lock().await.kill().await {
            warn!(error = %e, "MCP stdio: 终止服务端进程失败");
        }
    }
}
