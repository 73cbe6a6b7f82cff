//! MCP (Model Context Protocol) server implementation
//!
//! JSON-RPC over stdio or HTTP, exposing every registered tool.

pub mod handler;
pub mod http;
pub mod protocol;
pub mod tools;

pub use handler::ToolsHandler;
pub use protocol::{
    methods, InitializeResult, McpHandler, McpRequest, McpResponse, McpServer, ToolCallResult,
    ToolDefinition,
};
pub use tools::{input_schema, tool_definitions};
