use std::collections::HashMap;

/// 对话 Agent 要连接的 MCP 服务端
#[derive(Debug, Clone)]
pub struct McpServerConfig {
    /// 仅用于日志
    pub name: String,
    pub transport: TransportConfig,
}

#[derive(Debug, Clone)]
pub enum TransportConfig {
    /// 启动子进程，通过 stdin/stdout 逐行交换 JSON-RPC
    Stdio {
        command: String,
        args: Vec<String>,
        env: Vec<(String, String)>,
    },
    /// 向 `{base_url}/message` POST JSON-RPC
    Http {
        base_url: String,
        headers: HashMap<String, String>,
    },
}

impl McpServerConfig {
    pub fn stdio(
        name: impl Into<String>,
        command: impl Into<String>,
        args: Vec<impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            transport: TransportConfig::Stdio {
                command: command.into(),
                args: args.into_iter().map(Into::into).collect(),
                env: vec![],
            },
        }
    }

    /// 子进程额外注入的环境变量（例如把存储连接串传给子进程）
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let TransportConfig::Stdio { env, .. } = &mut self.transport {
            env.push((key.into(), value.into()));
        }
        self
    }

    /// 远端 MCP 端点；有 token 时带上 `Authorization: Bearer <token>`
    ///
    /// ```
    /// use todo_agent::mcp::McpServerConfig;
    /// let config = McpServerConfig::http("remote", "https://todo.example.com/mcp", Some("secret"));
    /// ```
    pub fn http(
        name: impl Into<String>,
        base_url: impl Into<String>,
        token: Option<&str>,
    ) -> Self {
        let mut headers = HashMap::new();
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            headers.insert("Authorization".to_string(), format!("Bearer {}", token));
        }
        Self {
            name: name.into(),
            transport: TransportConfig::Http {
                base_url: base_url.into(),
                headers,
            },
        }
    }
}
