//! 模型连接配置
//!
//! 由 [`crate::config::AppConfig`] 在启动时一次性构建，之后只读。

use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_BASEURL: &str = "https://api.openai.com/v1/chat/completions";

/// 单个模型的连接配置
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// LLM 接口中使用的模型名（如 `gpt-4o`）
    pub model: String,
    /// Chat Completions 接口完整 URL
    pub baseurl: String,
    pub apikey: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            baseurl: DEFAULT_BASEURL.to_string(),
            apikey: String::new(),
        }
    }
}

impl ModelConfig {
    pub fn has_apikey(&self) -> bool {
        !self.apikey.trim().is_empty()
    }
}
