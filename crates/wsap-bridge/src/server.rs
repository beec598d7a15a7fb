//! HTTP front of the command queue
//!
//! Controllers call `POST /observe|/act|/reset` and block until the game answers.
//! The game polls `GET /poll` and answers with `POST /result`.

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::protocol::{ActRequest, CommandType, ObserveRequest, ResetRequest, ResultSubmission};
use crate::queue::CommandQueue;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared router state
pub struct BridgeState {
    pub queue: CommandQueue,
    pub command_timeout: Duration,
}

impl BridgeState {
    pub fn new(command_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            queue: CommandQueue::new(),
            command_timeout,
        })
    }
}

/// Errors surfaced to HTTP callers as `{"error": "..."}`
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Bridge(BridgeError),
}

impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        Self::Bridge(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Bridge(err @ BridgeError::Timeout { .. }) => {
                (StatusCode::GATEWAY_TIMEOUT, err.to_string())
            }
            Self::Bridge(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

// The in-game HTTP client may send no body or no content type; treat both as `{}`
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    let bytes: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        body
    };
    serde_json::from_slice(bytes).map_err(|e| ApiError::BadRequest(format!("Invalid JSON: {}", e)))
}

/// Build the bridge router
pub fn router(state: Arc<BridgeState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/poll", get(poll))
        .route("/status", get(status))
        .route("/result", post(submit_result))
        .route("/observe", post(observe))
        .route("/act", post(act))
        .route("/reset", post(reset))
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn poll(State(state): State<Arc<BridgeState>>) -> Json<Value> {
    match state.queue.get_next_command() {
        Some(command) => Json(serde_json::to_value(command).unwrap_or_else(|_| json!({}))),
        None => Json(json!({})),
    }
}

async fn status(State(state): State<Arc<BridgeState>>) -> impl IntoResponse {
    Json(state.queue.status())
}

async fn submit_result(
    State(state): State<Arc<BridgeState>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let value: Value = parse_body(&body)?;
    if value.get("id").and_then(Value::as_str).is_none_or(str::is_empty) {
        return Err(ApiError::BadRequest("Missing command id".into()));
    }
    let submission: ResultSubmission = serde_json::from_value(value)
        .map_err(|e| ApiError::BadRequest(format!("Invalid result: {}", e)))?;

    let delivered = state.queue.submit_result(&submission.id, submission.result);
    Ok(Json(json!({ "ok": true, "delivered": delivered })))
}

async fn observe(
    State(state): State<Arc<BridgeState>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: ObserveRequest = parse_body(&body)?;
    let result = state
        .queue
        .submit(CommandType::Observe, request.into_payload(), state.command_timeout)
        .await?;
    Ok(Json(result))
}

async fn act(State(state): State<Arc<BridgeState>>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let request: ActRequest = parse_body(&body)?;
    let result = state
        .queue
        .submit(CommandType::Act, request.into_payload(), state.command_timeout)
        .await?;
    Ok(Json(result))
}

async fn reset(
    State(state): State<Arc<BridgeState>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: ResetRequest = parse_body(&body)?;
    let result = state
        .queue
        .submit(CommandType::Reset, request.into_payload(), state.command_timeout)
        .await?;
    Ok(Json(result))
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

/// Run the bridge until ctrl-c
pub async fn serve(config: BridgeConfig) -> std::io::Result<()> {
    let state = BridgeState::new(config.command_timeout);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!(
        "Bridge listening on http://{} (command timeout {:?})",
        listener.local_addr()?,
        config.command_timeout
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Bridge shutting down");
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body_parses_as_empty_object() {
        let request: ObserveRequest = parse_body(&Bytes::new()).unwrap();
        assert!(request.player_id.is_none());

        let request: ResetRequest = parse_body(&Bytes::from_static(b"  \n")).unwrap();
        assert!(request.player_id.is_none());
    }

    #[test]
    fn test_act_body_requires_action() {
        let err = parse_body::<ActRequest>(&Bytes::from_static(b"{}")).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
