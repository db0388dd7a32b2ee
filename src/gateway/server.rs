//! Gateway server assembly and lifecycle.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use super::api::{self, AppState};
use super::notify::DiscordSink;
use crate::config::{self, AppConfig};

/// Runtime settings for the gateway server.
pub struct ServerConfig {
    pub port: u16,
    pub dev_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            dev_mode: false,
        }
    }
}

/// Build the gateway router over shared state.
pub fn build_router(state: Arc<AppState>) -> Router {
    api::api_router().with_state(state)
}

/// Assemble gateway state from the loaded configuration and environment.
pub fn build_state(config: &AppConfig) -> Arc<AppState> {
    let channels = config::ChannelMap::from_env(&config.channels);
    let secret = config::signing_secret();
    Arc::new(AppState {
        org_name: config.org.name.clone(),
        auth_header: config.gateway.auth.header.clone(),
        endpoints: config.gateway.endpoints.clone(),
        channels,
        secret,
        sink: Arc::new(DiscordSink::from_env()),
    })
}

/// Start the gateway and serve until interrupted.
pub async fn start_gateway(config: AppConfig, server: ServerConfig) -> Result<()> {
    let state = build_state(&config);

    let paths: Vec<&str> = config
        .gateway
        .endpoints
        .iter()
        .map(|e| e.path.as_str())
        .collect();
    info!("configured endpoints: {}", paths.join(", "));
    info!(
        "signature verification: {}",
        if state.secret.is_some() { "enabled" } else { "disabled" }
    );
    if state.channels.is_empty() {
        warn!("no channels resolved from the environment, notifications will degrade");
    }

    let mut app = build_router(state);
    if server.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let host = if server.dev_mode { "0.0.0.0" } else { "127.0.0.1" };
    let addr = format!("{}:{}", host, server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("event gateway listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("gateway shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[test]
    fn server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert!(!config.dev_mode);
    }

    #[tokio::test]
    async fn built_router_serves_health() {
        let state = build_state(&AppConfig::default());
        let app = build_router(state);
        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
