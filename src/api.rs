//! REST API Server for the super agent router
//!
//! Exposes the turn executor over HTTP so many conversations can be served
//! concurrently by one process.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::error::AgentError;
use crate::executor::TurnExecutor;
use crate::models::Message;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub conversation_id: Option<String>,
    pub message: String,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub executor: Arc<TurnExecutor>,
}

/// =============================
/// Helpers: Conversation IDs
/// =============================

fn stable_uuid_from_string(input: &str) -> Uuid {
    use sha2::{Digest, Sha256};

    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes)
}

/// Client-chosen ids may be UUIDs or any label; no id starts a new conversation
fn parse_or_stable_uuid(value: Option<&str>) -> Uuid {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => {
            Uuid::parse_str(v).unwrap_or_else(|_| stable_uuid_from_string(v))
        }
        _ => Uuid::new_v4(),
    }
}

fn status_for(error: &AgentError) -> StatusCode {
    match error {
        AgentError::EmptyConversation | AgentError::InvalidMessage(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AgentError::Generation(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// =============================
/// Health Endpoint
/// =============================

async fn health(State(state): State<ApiState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "conversations": state.executor.conversation_count().await,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Chat Endpoint
/// =============================

async fn chat(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let conversation_id = parse_or_stable_uuid(req.conversation_id.as_deref());

    info!(conversation_id = %conversation_id, "Received chat turn");

    match state.executor.run_turn(conversation_id, &req.message).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "conversation_id": conversation_id,
                "route": outcome.route,
                "replies": outcome.replies,
            }))),
        ),
        Err(e) => (
            status_for(&e),
            Json(ApiResponse::error(format!("Turn failed: {}", e))),
        ),
    }
}

/// =============================
/// History Endpoint
/// =============================

async fn conversation_history(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> (StatusCode, Json<ApiResponse>) {
    let conversation_id = parse_or_stable_uuid(Some(&id));

    match state.executor.history(conversation_id).await {
        Some(history) => {
            let messages: Vec<&Message> = history.messages().collect();
            (
                StatusCode::OK,
                Json(ApiResponse::success(serde_json::json!({
                    "conversation_id": conversation_id,
                    "messages": messages,
                }))),
            )
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!(
                "Unknown conversation {}",
                conversation_id
            ))),
        ),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(executor: Arc<TurnExecutor>) -> Router {
    let state = ApiState { executor };

    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/conversations/:id", get(conversation_history))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    executor: Arc<TurnExecutor>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(executor);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
