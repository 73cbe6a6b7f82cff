//! ta-mcp CLI
//!
//! List and invoke indicator tools without starting a server.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};

use ta_mcp::tools::{Dispatcher, ToolRegistry};

#[derive(Parser)]
#[command(name = "ta-mcp-cli")]
#[command(about = "Technical-analysis tools from the command line")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available tools
    List,
    /// Call a tool and print the result envelope
    Call(CallArgs),
}

#[derive(clap::Args, Debug, Default)]
struct CallArgs {
    /// Tool name
    name: String,
    /// Open prices as a JSON array
    #[arg(long)]
    open: Option<String>,
    /// High prices as a JSON array
    #[arg(long)]
    high: Option<String>,
    /// Low prices as a JSON array
    #[arg(long)]
    low: Option<String>,
    /// Close prices as a JSON array
    #[arg(long)]
    close: Option<String>,
    /// Volume as a JSON array
    #[arg(long)]
    volume: Option<String>,
    /// Window length
    #[arg(long)]
    timeperiod: Option<i64>,
    /// Extra parameter as key=value (value parsed as JSON when possible)
    #[arg(short, long = "param")]
    params: Vec<String>,
    /// JSON file with a flat argument object
    #[arg(short, long)]
    file: Option<PathBuf>,
}

impl CallArgs {
    /// Merge the file payload with command-line overrides
    fn arguments(&self) -> anyhow::Result<Value> {
        let mut args = match &self.file {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                match serde_json::from_str::<Value>(&raw)
                    .with_context(|| format!("{} is not valid JSON", path.display()))?
                {
                    Value::Object(map) => map,
                    _ => bail!("{} must contain a JSON object", path.display()),
                }
            }
            None => Map::new(),
        };

        let series = [
            ("open", &self.open),
            ("high", &self.high),
            ("low", &self.low),
            ("close", &self.close),
            ("volume", &self.volume),
        ];
        for (role, raw) in series {
            if let Some(raw) = raw {
                let value: Value = serde_json::from_str(raw)
                    .with_context(|| format!("--{} must be a JSON array", role))?;
                args.insert(role.to_string(), value);
            }
        }

        if let Some(period) = self.timeperiod {
            args.insert("timeperiod".to_string(), json!(period));
        }

        for pair in &self.params {
            let (key, raw) = pair
                .split_once('=')
                .with_context(|| format!("--param '{}' must be key=value", pair))?;
            let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::from(raw));
            args.insert(key.trim().to_string(), value);
        }

        Ok(Value::Object(args))
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let dispatcher = Dispatcher::new(Arc::new(ToolRegistry::with_builtin_tools()));

    match cli.command {
        Commands::List => {
            let output = json!({ "tools": dispatcher.registry().list() });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Call(call) => {
            let arguments = call.arguments()?;
            let envelope = dispatcher.invoke_json(&call.name, &arguments);
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            if !envelope.is_success() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
