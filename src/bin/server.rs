//! ta-mcp server
//!
//! Run with: ta-mcp-server --mode mcp --transport stdio
//!       or: ta-mcp-server --mode api --port 8000

use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ta_mcp::api::{self, ApiConfig};
use ta_mcp::mcp::{self, McpServer, ToolsHandler};
use ta_mcp::tools::{Dispatcher, ToolRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// MCP JSON-RPC tool server
    Mcp,
    /// REST API (also mounts MCP at /mcp)
    Api,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Transport {
    Stdio,
    Http,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "ta-mcp-server")]
#[command(about = "Technical-analysis indicator server (MCP and REST)")]
#[command(version)]
struct Args {
    /// Server mode
    #[arg(long, env = "TA_MCP_MODE", value_enum, default_value = "mcp")]
    mode: Mode,

    /// MCP transport (ignored in api mode)
    #[arg(long, env = "TA_MCP_TRANSPORT", value_enum, default_value = "stdio")]
    transport: Transport,

    /// Bind host for HTTP transports
    #[arg(long, env = "TA_MCP_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Bind port for HTTP transports
    #[arg(long, env = "TA_MCP_PORT", default_value = "8000")]
    port: u16,

    /// Comma-separated subset of tools to register (default: all)
    #[arg(long, env = "TA_MCP_TOOLS", value_delimiter = ',')]
    tools: Vec<String>,

    /// Per-request timeout for the REST API, in seconds
    #[arg(long, env = "TA_MCP_REQUEST_TIMEOUT_SECS", default_value = "30")]
    request_timeout_secs: u64,

    /// Log output format
    #[arg(long, env = "TA_MCP_LOG_FORMAT", value_enum, default_value = "text")]
    log_format: LogFormat,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))?
            .next()
            .ok_or_else(|| anyhow!("{}:{} did not resolve", self.host, self.port))
    }
}

fn init_logging(args: &Args) {
    let filter = if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // Logs go to stderr; stdout carries the stdio protocol
    let fmt = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false);

    match args.log_format {
        LogFormat::Text => tracing_subscriber::registry().with(fmt).with(filter).init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt.json())
            .with(filter)
            .init(),
    }
}

fn build_registry(tools: &[String]) -> ta_mcp::Result<ToolRegistry> {
    if tools.iter().all(|t| t.trim().is_empty()) {
        Ok(ToolRegistry::with_builtin_tools())
    } else {
        ToolRegistry::with_selected_tools(tools)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let registry = build_registry(&args.tools).context("failed to compose tool registry")?;
    tracing::info!("Registered {} tools: {}", registry.len(), registry.list().join(", "));
    let dispatcher = Dispatcher::new(Arc::new(registry));

    match (args.mode, args.transport) {
        (Mode::Mcp, Transport::Stdio) => {
            tracing::info!("ta-mcp server starting on stdio...");
            McpServer::new(ToolsHandler::new(dispatcher)).run()?;
        }
        (Mode::Mcp, Transport::Http) => {
            let addr = args.bind_addr()?;
            let handler = Arc::new(ToolsHandler::new(dispatcher));
            let rt = tokio::runtime::Runtime::new().context("failed to create tokio runtime")?;
            rt.block_on(mcp::http::serve(handler, addr))?;
        }
        (Mode::Api, _) => {
            let addr = args.bind_addr()?;
            let config = ApiConfig {
                request_timeout: Duration::from_secs(args.request_timeout_secs),
                mount_mcp: true,
            };
            let app = api::router(dispatcher, &config);
            let rt = tokio::runtime::Runtime::new().context("failed to create tokio runtime")?;
            rt.block_on(api::serve(app, addr))?;
        }
    }

    Ok(())
}
