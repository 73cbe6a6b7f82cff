//! MCP request handler backed by the dispatcher

use serde_json::{json, Value};

use super::protocol::{
    codes, methods, InitializeResult, McpHandler, McpRequest, McpResponse, ToolCallResult,
};
use super::tools::tool_definitions;
use crate::error::TaError;
use crate::tools::Dispatcher;

/// Serves `tools/list` and `tools/call` from a shared dispatcher
#[derive(Debug, Clone)]
pub struct ToolsHandler {
    dispatcher: Dispatcher,
}

impl ToolsHandler {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    fn call_tool(&self, request: McpRequest) -> McpResponse {
        let Some(name) = request.params.get("name").and_then(Value::as_str) else {
            return McpResponse::from_error(
                request.id,
                &TaError::MissingParameter("name".to_string()),
            );
        };
        let arguments = match request.params.get("arguments") {
            None | Some(Value::Null) => json!({}),
            Some(args) => args.clone(),
        };

        let envelope = self.dispatcher.invoke_json(name, &arguments);
        if let Some(kind) = envelope.failure_kind() {
            tracing::debug!(tool = name, ?kind, "Tool call failed");
        }

        let mut result = ToolCallResult::json(&envelope);
        if !envelope.is_success() {
            result = result.failed();
        }
        McpResponse::success(request.id, json!(result))
    }
}

impl McpHandler for ToolsHandler {
    fn handle_request(&self, request: McpRequest) -> Option<McpResponse> {
        if request.jsonrpc != "2.0" {
            return Some(McpResponse::error(
                request.id,
                codes::INVALID_REQUEST,
                format!("Unsupported jsonrpc version: {}", request.jsonrpc),
            ));
        }

        let response = match request.method.as_str() {
            methods::INITIALIZE => {
                let result = InitializeResult::default();
                McpResponse::success(request.id, json!(result))
            }
            methods::INITIALIZED => return None,
            methods::PING => McpResponse::success(request.id, json!({})),
            methods::LIST_TOOLS => {
                let tools = tool_definitions(self.dispatcher.registry());
                McpResponse::success(request.id, json!({ "tools": tools }))
            }
            methods::CALL_TOOL => self.call_tool(request),
            _ if request.is_notification() => {
                tracing::debug!("Ignoring notification {}", request.method);
                return None;
            }
            _ => McpResponse::error(
                request.id,
                codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        };
        Some(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolRegistry;
    use std::sync::Arc;

    fn handler() -> ToolsHandler {
        ToolsHandler::new(Dispatcher::new(Arc::new(ToolRegistry::with_builtin_tools())))
    }

    fn request(value: Value) -> McpRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_initialize() {
        let response = handler()
            .handle_request(request(json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"})))
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], "ta-mcp");
    }

    #[test]
    fn test_initialized_notification_has_no_reply() {
        let response = handler().handle_request(request(
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        ));
        assert!(response.is_none());
    }

    #[test]
    fn test_unknown_method() {
        let response = handler()
            .handle_request(request(json!({"jsonrpc": "2.0", "id": 7, "method": "resources/list"})))
            .unwrap();
        assert_eq!(response.error.unwrap().code, codes::METHOD_NOT_FOUND);
    }

    #[test]
    fn test_call_tool_missing_name() {
        let response = handler()
            .handle_request(request(
                json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": {}}),
            ))
            .unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.code, codes::INVALID_PARAMS);
        assert!(error.message.contains("name"), "{}", error.message);
        assert_eq!(response.id, Some(json!(3)));
    }

    #[test]
    fn test_call_tool_non_string_name() {
        let response = handler()
            .handle_request(request(json!({
                "jsonrpc": "2.0",
                "id": 4,
                "method": "tools/call",
                "params": {"name": 42}
            })))
            .unwrap();
        assert_eq!(response.error.unwrap().code, codes::INVALID_PARAMS);
    }
}
