//! Gateway HTTP server (single port).

use crate::commit::{process_inbound, CommitResult, InboundContext};
use crate::config::Settings;
use crate::error::InboundError;
use crate::gateway::protocol::{ErrorResponse, HealthResponse, InboundResponse};
use crate::message::InboundMessage;
use crate::render::{converter_for, HtmlConverter};
use crate::store::{FileStore, GitHubStore};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

/// Header carrying the shared secret set in the Apps Script forwarder.
pub const WEBHOOK_TOKEN_HEADER: &str = "X-Webhook-Token";

/// Shared, read-only state: settings, store client, HTML converter.
#[derive(Clone)]
pub struct GatewayState {
    pub settings: Arc<Settings>,
    pub store: Arc<dyn FileStore>,
    pub converter: Arc<dyn HtmlConverter>,
}

impl GatewayState {
    /// State backed by the GitHub contents API and the converter named in settings.
    pub fn new(settings: Settings) -> Self {
        let store: Arc<dyn FileStore> = Arc::new(GitHubStore::new(&settings.github));
        let converter = converter_for(settings.html_converter);
        Self {
            settings: Arc::new(settings),
            store,
            converter,
        }
    }
}

/// Routes without binding, so tests and embedders can serve them however they like.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(health_http))
        .route("/gmail/inbound", post(gmail_inbound))
        .with_state(state)
}

pub async fn run_gateway(settings: Settings) -> Result<()> {
    let bind_addr = format!("{}:{}", settings.bind, settings.port);
    log::info!(
        "committing to {}/{} (default branch {}, {} allowed sender(s))",
        settings.github.owner,
        settings.github.repo,
        settings.github.default_branch,
        settings.allowed_senders.len()
    );
    let app = build_router(GatewayState::new(settings));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// GET /health returns a fixed ok body for liveness checks.
async fn health_http() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// POST /gmail/inbound — verifies the shared secret, parses the message, commits it.
async fn gmail_inbound(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match handle_inbound(&state, &headers, &body).await {
        Ok(result) => (StatusCode::OK, Json(InboundResponse::from(result))).into_response(),
        Err(e) => {
            match &e {
                InboundError::Store(err) => log::warn!("inbound commit failed: {}", err),
                other => log::debug!("inbound rejected: {}", other),
            }
            let status =
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::BAD_GATEWAY);
            (status, Json(ErrorResponse::new(e.to_string()))).into_response()
        }
    }
}

async fn handle_inbound(
    state: &GatewayState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<CommitResult, InboundError> {
    let provided = headers
        .get(WEBHOOK_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if provided.is_empty()
        || !constant_time_eq(provided.as_bytes(), state.settings.webhook_token.as_bytes())
    {
        return Err(InboundError::Unauthorized);
    }

    let msg = InboundMessage::from_json(body)
        .map_err(|e| InboundError::InvalidPayload(e.to_string()))?;

    let ctx = InboundContext {
        store: state.store.as_ref(),
        converter: state.converter.as_ref(),
        allowed_senders: &state.settings.allowed_senders,
        default_branch: &state.settings.github.default_branch,
    };
    process_inbound(&ctx, &msg, chrono::Utc::now()).await
}

/// Byte comparison whose running time depends only on the lengths, not on where the inputs differ.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
