//! HTTP surface: webhook intake, manual webhook registration, health and
//! a read-only view of the audit log.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::{Body, Bytes},
    extract::{Query, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::signal;
use tracing::{error, info, warn};

use crate::audit::AuditStore;
use crate::relay::{Ack, Relay};

const DEFAULT_RECORD_LIMIT: usize = 50;
const MAX_RECORD_LIMIT: usize = 500;

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
    pub store: AuditStore,
    pub webhook_url: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordsParams {
    pub limit: Option<usize>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(register_webhook))
        .route("/webhook", post(webhook))
        .route("/health", get(health_check))
        .route("/api/records", get(records))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn run(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Webhook server listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Middleware to log all incoming HTTP requests
async fn log_request(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    info!("{} {} -> {}", method, path, response.status());
    response
}

/// Inbound Telegram update. Always 200 once a message is present.
async fn webhook(State(state): State<AppState>, body: Bytes) -> (StatusCode, Json<Value>) {
    let update: Value = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!("Unparseable webhook body ({} bytes): {}", body.len(), e);
            return rejected();
        }
    };

    // Own task so a dropped connection does not cancel in-flight sends
    let relay = state.relay.clone();
    let ack = match tokio::spawn(async move { relay.handle(&update).await }).await {
        Ok(ack) => ack,
        Err(e) => {
            // Panicked inside processing; the platform must still get an ack
            error!("Webhook task failed: {}", e);
            Ack::Ok
        }
    };

    match ack {
        Ack::Ok => (StatusCode::OK, Json(json!({"status": "ok"}))),
        Ack::Rejected => rejected(),
    }
}

fn rejected() -> (StatusCode, Json<Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({"status": "error"})))
}

/// Manual `setWebhook` trigger for the configured public URL.
async fn register_webhook(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    if state.webhook_url.is_empty() {
        return (
            StatusCode::BAD_GATEWAY,
            Json(json!({"ok": false, "description": "webhook_url is not configured"})),
        );
    }

    match state.relay.platform().set_webhook(&state.webhook_url).await {
        Ok(()) => {
            info!("Webhook registered at {}", state.webhook_url);
            (
                StatusCode::OK,
                Json(json!({"ok": true, "result": true, "description": "Webhook was set"})),
            )
        }
        Err(e) => {
            error!("setWebhook failed: {:#}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({"ok": false, "description": format!("{e:#}")})),
            )
        }
    }
}

/// Most recent audit records, newest first.
async fn records(
    State(state): State<AppState>,
    Query(params): Query<RecordsParams>,
) -> (StatusCode, Json<Value>) {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_RECORD_LIMIT)
        .clamp(1, MAX_RECORD_LIMIT);

    match state.store.recent(limit).await {
        Ok(records) => (StatusCode::OK, Json(json!({"records": records}))),
        Err(e) => {
            error!("Failed to read audit records: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "failed to read records"})),
            )
        }
    }
}
