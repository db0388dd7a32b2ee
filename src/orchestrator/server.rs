//! Orchestrator server assembly and lifecycle.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::CorsLayer;
use tracing::info;

use super::api::{self, AppState};
use super::lifecycle::{LifecycleDriver, PhaseSchedule};
use super::metrics::OrchestratorMetrics;
use super::store::{InMemoryStore, RequestStore};
use crate::config::AppConfig;

/// Runtime settings for the orchestrator server.
pub struct ServerConfig {
    pub port: u16,
    pub dev_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8085,
            dev_mode: false,
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    api::api_router().with_state(state)
}

/// Assemble orchestrator state: in-memory store, metrics, and the
/// transition driver wired together.
pub fn build_state(config: &AppConfig) -> Result<Arc<AppState>> {
    let store: Arc<dyn RequestStore> = Arc::new(InMemoryStore::new());
    let metrics = Arc::new(OrchestratorMetrics::new().context("Failed to register metrics")?);
    let schedule = PhaseSchedule::from_config(&config.orchestrator);
    let driver = LifecycleDriver::new(store.clone(), schedule, metrics.clone());
    Ok(Arc::new(AppState {
        store,
        driver,
        metrics,
        config: config.orchestrator.clone(),
    }))
}

/// Start the orchestrator and serve until interrupted.
pub async fn start_orchestrator(config: AppConfig, server: ServerConfig) -> Result<()> {
    let state = build_state(&config)?;

    let sweeper = state.driver.spawn_sweeper(&config.orchestrator);
    info!(
        "phase delays: {:?}s, retention: {}s",
        config.orchestrator.phase_delays_secs, config.orchestrator.retention_secs
    );

    let mut app = build_router(state);
    if server.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let host = if server.dev_mode { "0.0.0.0" } else { "127.0.0.1" };
    let addr = format!("{}:{}", host, server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("orchestrator listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    sweeper.cancel();
    info!("orchestrator shut down gracefully");
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
        assert_eq!(config.port, 8085);
        assert!(!config.dev_mode);
    }

    #[tokio::test]
    async fn built_router_serves_health() {
        let state = build_state(&AppConfig::default()).unwrap();
        let app = build_router(state);
        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
