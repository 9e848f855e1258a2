use std::fmt;

/// todo-agent 的统一错误类型
///
/// 只承载"意外故障"。记录不存在、参数不合法属于正常业务结果，
/// 由 [`crate::todo::Outcome`] 表达，不走这里。
#[derive(Debug)]
pub enum TodoError {
    /// 存储层故障
    Storage(StoreError),
    /// LLM 相关错误
    Llm(LlmError),
    /// MCP 协议 / 传输错误
    Mcp(McpError),
    /// 对话 Agent 执行错误
    Agent(AgentError),
    /// 配置错误
    Config(ConfigError),
    /// IO 错误
    Io(std::io::Error),
    /// 其他错误
    Other(String),
}

/// 存储层故障（连接、读写、序列化）
#[derive(Debug)]
pub enum StoreError {
    /// 读写存储文件失败
    IoError(String),
    /// 记录序列化 / 反序列化失败
    SerializationError(String),
    /// 无法识别的存储连接串
    UnsupportedUrl(String),
}

/// LLM 相关错误
#[derive(Debug)]
pub enum LlmError {
    /// 网络请求失败
    NetworkError(String),
    /// API 返回错误状态码
    ApiError { status: u16, message: String },
    /// 响应格式无效
    InvalidResponse(String),
    /// 没有返回内容
    EmptyResponse,
}

/// MCP 错误
#[derive(Debug)]
pub enum McpError {
    /// 无法建立连接（子进程启动失败、HTTP 不可达）
    ConnectionFailed(String),
    /// initialize 握手失败
    InitializationFailed(String),
    /// JSON-RPC 报文读写失败
    ProtocolError(String),
    /// tools/call 返回协议级错误
    ToolCallFailed(String),
    /// 传输层已关闭
    TransportClosed,
}

/// 对话 Agent 执行错误
#[derive(Debug)]
pub enum AgentError {
    /// 超过最大迭代次数
    MaxIterationsExceeded(usize),
    /// 模型给出的工具参数不是合法 JSON
    InvalidToolArguments { tool: String, message: String },
}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 配置文件未找到
    FileNotFound(String),
    /// 配置解析失败
    ParseFailed(String),
    /// 缺少必需的配置项
    MissingField(String),
    /// 配置值无效
    InvalidValue { field: String, message: String },
}

impl fmt::Display for TodoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TodoError::Storage(e) => write!(f, "Storage Error: {}", e),
            TodoError::Llm(e) => write!(f, "LLM Error: {}", e),
            TodoError::Mcp(e) => write!(f, "MCP Error: {}", e),
            TodoError::Agent(e) => write!(f, "Agent Error: {}", e),
            TodoError::Config(e) => write!(f, "Config Error: {}", e),
            TodoError::Io(e) => write!(f, "IO Error: {}", e),
            TodoError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::IoError(msg) => write!(f, "I/O failure: {}", msg),
            StoreError::SerializationError(msg) => write!(f, "Serialization failure: {}", msg),
            StoreError::UnsupportedUrl(url) => write!(f, "Unsupported store url: {}", url),
        }
    }
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            LlmError::ApiError { status, message } => {
                write!(f, "API error (status {}): {}", status, message)
            }
            LlmError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            LlmError::EmptyResponse => write!(f, "Empty response from LLM"),
        }
    }
}

impl fmt::Display for McpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            McpError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            McpError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            McpError::ProtocolError(msg) => write!(f, "Protocol error: {}", msg),
            McpError::ToolCallFailed(msg) => write!(f, "Tool call failed: {}", msg),
            McpError::TransportClosed => write!(f, "Transport closed"),
        }
    }
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentError::MaxIterationsExceeded(n) => {
                write!(f, "Max iterations exceeded: {}", n)
            }
            AgentError::InvalidToolArguments { tool, message } => {
                write!(f, "Invalid arguments for tool '{}': {}", tool, message)
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {}", path),
            ConfigError::ParseFailed(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::MissingField(field) => write!(f, "Missing config field: {}", field),
            ConfigError::InvalidValue { field, message } => {
                write!(f, "Invalid config value for '{}': {}", field, message)
            }
        }
    }
}

impl std::error::Error for TodoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TodoError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for StoreError {}
impl std::error::Error for LlmError {}
impl std::error::Error for McpError {}
impl std::error::Error for AgentError {}
impl std::error::Error for ConfigError {}

// From 转换实现
impl From<std::io::Error> for TodoError {
    fn from(err: std::io::Error) -> Self {
        TodoError::Io(err)
    }
}

impl From<reqwest::Error> for TodoError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TodoError::Llm(LlmError::NetworkError("Request timeout".to_string()))
        } else if err.is_connect() {
            TodoError::Llm(LlmError::NetworkError(format!(
                "Connection failed: {}",
                err
            )))
        } else {
            TodoError::Llm(LlmError::NetworkError(err.to_string()))
        }
    }
}

impl From<serde_json::Error> for TodoError {
    fn from(err: serde_json::Error) -> Self {
        TodoError::Other(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for TodoError {
    fn from(err: serde_yaml::Error) -> Self {
        TodoError::Config(ConfigError::ParseFailed(err.to_string()))
    }
}

impl From<StoreError> for TodoError {
    fn from(err: StoreError) -> Self {
        TodoError::Storage(err)
    }
}

impl From<LlmError> for TodoError {
    fn from(err: LlmError) -> Self {
        TodoError::Llm(err)
    }
}

impl From<McpError> for TodoError {
    fn from(err: McpError) -> Self {
        TodoError::Mcp(err)
    }
}

impl From<AgentError> for TodoError {
    fn from(err: AgentError) -> Self {
        TodoError::Agent(err)
    }
}

impl From<ConfigError> for TodoError {
    fn from(err: ConfigError) -> Self {
        TodoError::Config(err)
    }
}

// 便捷的 Result 类型别名
pub type Result<T> = std::result::Result<T, TodoError>;
