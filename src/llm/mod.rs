mod client;
pub mod config;
pub mod types;

use crate::error::{LlmError, Result, TodoError};
use crate::llm::client::post;
use crate::llm::config::ModelConfig;
use crate::llm::types::{ChatCompletionRequest, Message, ToolDefinition};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::HeaderMap;
use std::sync::Arc;

pub fn assemble_req_header(model: &ModelConfig) -> Result<HeaderMap> {
    let mut header_map = HeaderMap::new();

    header_map.insert(
        "Authorization",
        format!("Bearer {}", model.apikey)
            .parse()
            .map_err(|e| TodoError::Other(format!("Invalid Authorization header: {}", e)))?,
    );
    header_map.insert(
        "Content-Type",
        "application/json"
            .parse()
            .map_err(|e| TodoError::Other(format!("Invalid Content-Type header: {}", e)))?,
    );
    Ok(header_map)
}

/// 对话 Agent 依赖的 LLM 接口
///
/// 一次调用 = 一次完整的 chat completion，返回模型的 assistant 消息
/// （可能带 `tool_calls`）。测试中用 [`crate::testing::MockLlmClient`] 替换。
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat(&self, messages: Vec<Message>, tools: Vec<ToolDefinition>) -> Result<Message>;
}

/// OpenAI 兼容的 Chat Completions 客户端
pub struct OpenAiClient {
    client: Arc<Client>,
    model: ModelConfig,
    temperature: Option<f32>,
}

impl OpenAiClient {
    pub fn new(client: Arc<Client>, model: ModelConfig) -> Self {
        Self {
            client,
            model,
            temperature: Some(0.0),
        }
    }

    pub fn temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model_name(&self) -> &str {
        &self.model.model
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat(&self, messages: Vec<Message>, tools: Vec<ToolDefinition>) -> Result<Message> {
        let request_body = ChatCompletionRequest {
            model: self.model.model.clone(),
            messages,
            tool_choice: (!tools.is_empty()).then(|| "auto".to_string()),
            tools: (!tools.is_empty()).then_some(tools),
            temperature: self.temperature,
            max_tokens: None,
        };

        let header_map = assemble_req_header(&self.model)?;
        let response = post(
            self.client.clone(),
            &request_body,
            header_map,
            self.model.baseurl.as_str(),
        )
        .await?;

        response
            .into_message()
            .ok_or_else(|| LlmError::EmptyResponse.into())
    }
}
