use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use todo_agent::agent::{Agent, AgentCallback, AgentConfig, TodoAgent, TurnOutcome};
use todo_agent::config::AppConfig;
use todo_agent::error::{ConfigError, Result, TodoError};
use todo_agent::http::{self, AppState};
use todo_agent::llm::OpenAiClient;
use todo_agent::mcp::{McpClient, McpServer, McpServerConfig};
use todo_agent::todo::{TodoService, open_store};
use todo_agent::tools::{DispatchTool, TodoDispatcher, Tool, list_tools};

#[derive(Parser)]
#[command(name = "todo-agent", version, about = "Todo backend with REST, MCP and chat front-ends")]
struct Cli {
    /// YAML 配置文件
    #[arg(long, global = true)]
    config: Option<String>,

    /// 存储连接串，覆盖 TODO_STORE_URL（memory:// 或 file://<path>）
    #[arg(long, global = true)]
    store: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// REST API + /mcp/message
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// stdio MCP 服务端
    Mcp,
    /// 交互式对话
    Chat(AgentSource),
    /// 单轮对话
    Ask {
        prompt: String,
        #[command(flatten)]
        source: AgentSource,
    },
    /// 打印工具目录
    Tools,
}

/// 对话 Agent 的工具从哪里来
#[derive(Args)]
struct AgentSource {
    /// 连接远端 MCP 端点；不带地址时使用 TODO_MCP_ENDPOINT
    #[arg(long, num_args = 0..=1, default_missing_value = "")]
    remote: Option<String>,

    /// 不经过 MCP，直接在进程内调用工具
    #[arg(long, conflicts_with = "remote")]
    in_process: bool,
}

impl Command {
    fn default_log_filter(&self) -> &'static str {
        match self {
            Command::Chat(_) | Command::Ask { .. } => "todo_agent=warn",
            _ => "todo_agent=info",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout 留给协议报文和对话输出，日志统一写 stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.command.default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(store) = cli.store {
        config.store_url = store;
    }

    match cli.command {
        Command::Serve { port } => {
            let port = port.unwrap_or(config.port);
            let state = AppState::new(open_service(&config)?);
            http::serve(SocketAddr::from(([0, 0, 0, 0], port)), state).await
        }
        Command::Mcp => {
            let dispatcher = Arc::new(TodoDispatcher::new(open_service(&config)?));
            McpServer::new(dispatcher).serve_stdio().await
        }
        Command::Chat(source) => {
            let (mut agent, client) = build_agent(&config, &source, true).await?;
            let result = repl(&mut agent).await;
            if let Some(client) = client {
                client.close().await;
            }
            result
        }
        Command::Ask { prompt, source } => {
            let (mut agent, client) = build_agent(&config, &source, false).await?;
            let result = agent.chat(&prompt).await;
            if let Some(client) = client {
                client.close().await;
            }
            println!("{}", result?.text());
            Ok(())
        }
        Command::Tools => {
            println!("{}", serde_json::to_string_pretty(&list_tools())?);
            Ok(())
        }
    }
}

fn open_service(config: &AppConfig) -> Result<TodoService> {
    Ok(TodoService::new(open_store(&config.store_url)?))
}

async fn build_agent(
    config: &AppConfig,
    source: &AgentSource,
    interactive: bool,
) -> Result<(TodoAgent, Option<Arc<McpClient>>)> {
    let model = config.require_model()?.clone();
    let llm = Arc::new(OpenAiClient::new(Arc::new(reqwest::Client::new()), model));

    let (tools, client): (Vec<Box<dyn Tool>>, _) = if source.in_process {
        let dispatcher = Arc::new(TodoDispatcher::new(open_service(config)?));
        (DispatchTool::all(dispatcher), None)
    } else {
        let client = McpClient::new(mcp_server_config(config, source)?).await?;
        (client.adapted_tools(), Some(client))
    };

    let mut agent_config = AgentConfig::default();
    if interactive {
        agent_config = agent_config.with_callback(Arc::new(ConsoleCallback));
    }
    let mut agent = TodoAgent::new(agent_config, llm);
    agent.register_tools(tools);
    Ok((agent, client))
}

fn mcp_server_config(config: &AppConfig, source: &AgentSource) -> Result<McpServerConfig> {
    if let Some(remote) = &source.remote {
        let endpoint = if remote.is_empty() {
            config
                .mcp_endpoint
                .clone()
                .ok_or_else(|| ConfigError::MissingField("TODO_MCP_ENDPOINT".to_string()))?
        } else {
            remote.clone()
        };
        return Ok(McpServerConfig::http(
            "remote",
            endpoint,
            config.mcp_token.as_deref(),
        ));
    }

    // 默认：以子进程方式启动自身的 mcp 子命令
    let exe = std::env::current_exe()?;
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "todo_agent=warn".to_string());
    Ok(
        McpServerConfig::stdio("local", exe.to_string_lossy(), vec!["mcp"])
            .with_env("TODO_STORE_URL", config.store_url.clone())
            .with_env("RUST_LOG", log_filter),
    )
}

async fn repl(agent: &mut TodoAgent) -> Result<()> {
    let mut editor = DefaultEditor::new().map_err(readline_error)?;

    println!("🤖 Todo Chat Agent");
    println!("💬 Ask me to manage your todos, e.g.:");
    println!("   - \"Create a todo to buy groceries\"");
    println!("   - \"Show me all my todos\"");
    println!("   - \"Mark the first todo as completed\"");
    println!("Type \"exit\" to quit.\n");

    loop {
        let line = match tokio::task::block_in_place(|| editor.readline("You: ")) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(readline_error(e)),
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }
        let _ = editor.add_history_entry(input);

        match agent.chat(input).await {
            Ok(TurnOutcome::Answer(text)) => println!("\n🤖 Agent: {}\n", text),
            Ok(TurnOutcome::NeedsClarification(question)) => {
                println!("\n❓ Agent: {}\n", question)
            }
            Err(e) => eprintln!("❌ Error: {}\n", e),
        }
    }

    println!("\n👋 Goodbye!");
    Ok(())
}

fn readline_error(e: ReadlineError) -> TodoError {
    TodoError::Other(format!("readline: {}", e))
}

/// 实时打印工具调用
struct ConsoleCallback;

#[async_trait]
impl AgentCallback for ConsoleCallback {
    async fn on_tool_start(&self, _agent: &str, tool: &str, args: &Value) {
        println!("\n🔧 Using tool: {}", tool);
        println!("📥 Input: {}", args);
    }

    async fn on_tool_end(&self, _agent: &str, _tool: &str, success: bool, output: &str) {
        let marker = if success { "📤" } else { "⚠️" };
        println!("{} Result: {}\n", marker, output);
    }
}
