//! MCP over HTTP: one JSON-RPC message per `POST /mcp`

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};

use super::handler::ToolsHandler;
use super::protocol::{McpHandler, McpResponse};

const INTERNAL_ERROR: i64 = -32603;

/// Router exposing `POST /mcp`
pub fn router(handler: Arc<ToolsHandler>) -> Router {
    Router::new()
        .route("/mcp", post(mcp_handler))
        .with_state(handler)
}

/// Serve MCP over HTTP on `addr`
pub async fn serve(handler: Arc<ToolsHandler>, addr: SocketAddr) -> std::io::Result<()> {
    let app = router(handler);

    tracing::info!("MCP HTTP transport listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn mcp_handler(State(handler): State<Arc<ToolsHandler>>, body: String) -> Response {
    let outcome = tokio::task::spawn_blocking(move || handler.handle_message(&body)).await;

    match outcome {
        Ok(Some(response)) => Json(response).into_response(),
        Ok(None) => StatusCode::ACCEPTED.into_response(),
        Err(e) => {
            tracing::error!("MCP request task failed: {}", e);
            let response = McpResponse::error(None, INTERNAL_ERROR, "Internal error".to_string());
            (StatusCode::INTERNAL_SERVER_ERROR, Json(response)).into_response()
        }
    }
}
