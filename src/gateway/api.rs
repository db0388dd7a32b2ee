//! HTTP handlers for the gateway endpoints.
//!
//! Every webhook handler reads the raw body bytes before parsing so the
//! signature check covers exactly what the sender signed. Parsing is
//! lenient after that: a malformed body degrades to defaults instead of a
//! parse error, matching how upstream senders behave on retries.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

use crate::config::ChannelMap;
use crate::gateway::notify::{
    self, AlertPayload, GitPayload, MAX_NOTIFICATIONS_PER_CALL, NotificationSink, ServiceEvent,
};
use crate::gateway::routes::{self, EndpointConfig};
use crate::gateway::signature::{self, Verification};

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub org_name: String,
    /// Header carrying the hex HMAC digest.
    pub auth_header: String,
    pub endpoints: Vec<EndpointConfig>,
    pub channels: ChannelMap,
    pub secret: Option<String>,
    pub sink: Arc<dyn NotificationSink>,
}

pub type SharedState = Arc<AppState>;

// ── Error handling ────────────────────────────────────────────────────

pub enum ApiError {
    /// Bad or missing signature. Deliberately carries no diagnostic.
    Unauthorized,
    Forbidden(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Invalid signature".to_string()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({"error": message}))).into_response()
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health))
        .route("/event", post(receive_event))
        .route("/alert", post(receive_alert))
        .route("/git", post(receive_git))
}

// ── Helpers ───────────────────────────────────────────────────────────

/// Verify the request signature against the raw body. Terminal on failure.
fn authenticate(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<(), ApiError> {
    let supplied = headers
        .get(state.auth_header.to_lowercase())
        .and_then(|v| v.to_str().ok());
    match signature::verify(state.secret.as_deref(), body, supplied) {
        Verification::Invalid => Err(ApiError::Unauthorized),
        Verification::Valid | Verification::Disabled => Ok(()),
    }
}

/// Look up the endpoint block for `path`, a 404 when it was never configured.
fn endpoint_for<'a>(state: &'a AppState, path: &str) -> Result<&'a EndpointConfig, ApiError> {
    routes::find_endpoint(&state.endpoints, path)
        .ok_or_else(|| ApiError::NotFound(format!("Endpoint {path} not configured")))
}

/// Resolve a logical channel to its external id, or the graceful-degradation
/// response the sender should see when the mapping is absent.
fn resolve_channel<'a>(state: &'a AppState, channel: &str) -> Result<&'a str, Response> {
    match state.channels.resolve(channel) {
        Some(id) => Ok(id),
        None => {
            warn!("channel id not configured for {channel}");
            Err(Json(json!({"warning": format!("Channel {channel} not configured")}))
                .into_response())
        }
    }
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "config": state.org_name,
    }))
}

/// `POST /event` — generic service events.
async fn receive_event(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    authenticate(&state, &headers, &body)?;
    let endpoint = endpoint_for(&state, "/event")?;

    let event: ServiceEvent = serde_json::from_slice(&body).unwrap_or_default();
    let service = event.service();
    info!("received /event from service {service}");

    if !endpoint.service_allowed(service) {
        return Err(ApiError::Forbidden(format!("Service {service} not allowed")));
    }

    let channel_id = match resolve_channel(&state, &endpoint.channel) {
        Ok(id) => id.to_string(),
        Err(degraded) => return Ok(degraded),
    };

    let notification = notify::service_event_notification(&event);
    if let Err(e) = state.sink.deliver(&channel_id, &[notification]).await {
        warn!("service event delivery failed: {e}");
    }
    Ok(Json(json!({"ok": true, "channel_id": channel_id})).into_response())
}

/// `POST /alert` — alert-manager batches (or a bare single alert).
async fn receive_alert(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    authenticate(&state, &headers, &body)?;
    let endpoint = endpoint_for(&state, "/alert")?;

    let channel_id = match resolve_channel(&state, &endpoint.channel) {
        Ok(id) => id.to_string(),
        Err(degraded) => return Ok(degraded),
    };

    let alerts = serde_json::from_slice::<AlertPayload>(&body)
        .map(AlertPayload::into_alerts)
        .unwrap_or_default();
    info!("received /alert with {} alert(s)", alerts.len());

    // One failing delivery must not block the rest of the batch.
    let mut delivered = 0usize;
    for alert in alerts.iter().take(MAX_NOTIFICATIONS_PER_CALL) {
        let notification = notify::alert_notification(alert);
        match state.sink.deliver(&channel_id, &[notification]).await {
            Ok(()) => delivered += 1,
            Err(e) => warn!("alert delivery failed: {e}"),
        }
    }
    Ok(Json(json!({"ok": true, "alerts": delivered})).into_response())
}

/// `POST /git` — GitHub webhooks, routed by event type, action, and branch.
async fn receive_git(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    authenticate(&state, &headers, &body)?;
    let endpoint = endpoint_for(&state, "/git")?;

    let Some(event) = headers.get("x-github-event").and_then(|v| v.to_str().ok()) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Missing X-GitHub-Event header"})),
        )
            .into_response());
    };
    let event = event.to_string();
    let payload: GitPayload = serde_json::from_slice(&body).unwrap_or_default();
    info!("received /git webhook {event}");

    let action = payload.action.as_deref();
    let branch = payload.git_ref.as_deref().map(routes::branch_from_ref);
    let Some(route) = endpoint.resolve_route(&event, action, branch) else {
        return Ok(Json(json!({
            "info": format!("No route configured for {event}:{}", action.unwrap_or("none"))
        }))
        .into_response());
    };

    let channel_id = match resolve_channel(&state, &route.channel) {
        Ok(id) => id.to_string(),
        Err(degraded) => return Ok(degraded),
    };

    let notification = notify::git_notification(&event, &payload);
    if let Err(e) = state.sink.deliver(&channel_id, &[notification]).await {
        warn!("git event delivery failed: {e}");
    }
    Ok(Json(json!({"ok": true, "event": event, "action": action})).into_response())
}
