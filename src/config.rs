//! 进程级配置
//!
//! 启动时读取一次：默认值 → 可选 YAML 文件 → 环境变量（先加载 `.env`）→ 命令行参数。
//!
//! ```text
//! TODO_STORE_URL=file://~/.todo-agent/todos.json   # 或 memory://
//! PORT=3000
//! TODO_MODEL=gpt-4o
//! OPENAI_API_KEY=sk-...
//! OPENAI_BASE_URL=https://api.openai.com/v1/chat/completions
//! TODO_MCP_ENDPOINT=https://example.com/mcp
//! TODO_MCP_TOKEN=...
//! ```

use crate::error::{ConfigError, Result};
use crate::llm::config::ModelConfig;
use dotenv::dotenv;
use serde::{Deserialize, Serialize};

pub const DEFAULT_STORE_URL: &str = "file://~/.todo-agent/todos.json";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// 存储连接串
    pub store_url: String,
    /// REST 服务端口
    pub port: u16,
    pub model: ModelConfig,
    /// 远端 MCP 端点（`chat --remote` 不带地址时使用）
    pub mcp_endpoint: Option<String>,
    /// 远端 MCP 端点的 Bearer token
    pub mcp_token: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_url: DEFAULT_STORE_URL.to_string(),
            port: DEFAULT_PORT,
            model: ModelConfig::default(),
            mcp_endpoint: None,
            mcp_token: None,
        }
    }
}

impl AppConfig {
    pub fn load(path: Option<&str>) -> Result<Self> {
        dotenv().ok();
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let file =
            std::fs::File::open(path).map_err(|_| ConfigError::FileNotFound(path.to_string()))?;
        let config: AppConfig = serde_yaml::from_reader(file)?;
        Ok(config)
    }

    /// 用环境变量覆盖已有配置，`lookup` 便于测试时注入
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup("TODO_STORE_URL") {
            self.store_url = url;
        }
        if let Some(port) = lookup("PORT") {
            self.port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: "PORT".to_string(),
                message: format!("'{}' is not a valid port", port),
            })?;
        }
        if let Some(model) = lookup("TODO_MODEL") {
            self.model.model = model;
        }
        if let Some(baseurl) = lookup("OPENAI_BASE_URL") {
            self.model.baseurl = baseurl;
        }
        if let Some(apikey) = lookup("OPENAI_API_KEY") {
            self.model.apikey = apikey;
        }
        if let Some(endpoint) = lookup("TODO_MCP_ENDPOINT") {
            self.mcp_endpoint = Some(endpoint);
        }
        if let Some(token) = lookup("TODO_MCP_TOKEN") {
            self.mcp_token = Some(token);
        }
        Ok(())
    }

    /// 对话 Agent 需要模型凭据
    pub fn require_model(&self) -> Result<&ModelConfig> {
        if !self.model.has_apikey() {
            return Err(ConfigError::MissingField("OPENAI_API_KEY".to_string()).into());
        }
        Ok(&self.model)
    }
}
