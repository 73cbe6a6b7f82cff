//! REST endpoints

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::error::TaError;
use crate::mcp::{self, ToolsHandler};
use crate::tools::{split_arguments, Dispatcher};
use crate::types::Envelope;

/// HTTP surface settings
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Upper bound on one request, including computation
    pub request_timeout: Duration,
    /// Mount the MCP JSON-RPC endpoint at `/mcp`
    pub mount_mcp: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            mount_mcp: true,
        }
    }
}

/// Shared state handed to every REST handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
}

/// Build the REST router with CORS, tracing and timeout middleware
pub fn router(dispatcher: Dispatcher, config: &ApiConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = Arc::new(AppState {
        dispatcher: dispatcher.clone(),
    });

    let mut app = Router::new()
        .route("/health", get(health))
        .route("/tools", get(list_tools))
        .route("/tools/:name", post(call_tool))
        .with_state(state);

    if config.mount_mcp {
        app = app.merge(mcp::http::router(Arc::new(ToolsHandler::new(dispatcher))));
    }

    app.layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Start the REST server
pub async fn serve(app: Router, addr: SocketAddr) -> std::io::Result<()> {
    tracing::info!("REST API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "detail": message.into() }))).into_response()
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "tools": state.dispatcher.registry().len(),
    }))
}

async fn list_tools(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "tools": state.dispatcher.registry().list() }))
}

async fn call_tool(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Response {
    let Some(unit) = state.dispatcher.registry().get(&name) else {
        return detail(StatusCode::NOT_FOUND, "tool not found");
    };

    let arguments: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            return detail(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("invalid JSON body: {}", e),
            )
        }
    };
    let Some(object) = arguments.as_object() else {
        return detail(
            StatusCode::UNPROCESSABLE_ENTITY,
            "request body must be a JSON object",
        );
    };

    let (inputs, params) = match split_arguments(unit.as_ref(), object) {
        Ok(split) => split,
        Err(e) => return detail(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
    };

    let dispatcher = state.dispatcher.clone();
    let task_name = name.clone();
    let outcome =
        tokio::task::spawn_blocking(move || dispatcher.invoke(&task_name, &inputs, &params)).await;

    match outcome {
        Ok(envelope) => {
            if let Some(kind) = envelope.failure_kind() {
                tracing::debug!(tool = %name, ?kind, "Tool call failed");
            }
            (StatusCode::OK, Json(envelope)).into_response()
        }
        Err(e) => {
            tracing::error!(tool = %name, "Tool task failed: {}", e);
            let envelope = Envelope::failure(&TaError::Internal("computation task failed".into()));
            (StatusCode::INTERNAL_SERVER_ERROR, Json(envelope)).into_response()
        }
    }
}
