//! Local command API
//!
//! `POST /operation` with `{"operation": <int>}` relays the id to the game.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tts_bridge::CommandForwarder;

/// Port the command API listens on
pub const DEFAULT_API_PORT: u16 = 39997;

#[derive(Debug, Deserialize)]
pub struct OperationRequest {
    pub operation: i64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn router(forwarder: Arc<CommandForwarder>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/operation", post(operation))
        .with_state(forwarder)
}

pub async fn bind(addr: &str) -> anyhow::Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    info!("Command API listening on http://{}", listener.local_addr()?);
    Ok(listener)
}

pub async fn serve(listener: TcpListener, forwarder: Arc<CommandForwarder>) -> anyhow::Result<()> {
    axum::serve(listener, router(forwarder)).await?;
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn operation(
    State(forwarder): State<Arc<CommandForwarder>>,
    Json(request): Json<OperationRequest>,
) -> (StatusCode, Json<OperationResponse>) {
    match forwarder.forward(request.operation).await {
        Ok(()) => {
            info!("Forwarded operation {}", request.operation);
            (
                StatusCode::OK,
                Json(OperationResponse {
                    status: "ok".into(),
                    error: None,
                }),
            )
        }
        Err(e) => {
            warn!("Operation {} failed: {}", request.operation, e);
            (
                StatusCode::BAD_GATEWAY,
                Json(OperationResponse {
                    status: "error".into(),
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}
