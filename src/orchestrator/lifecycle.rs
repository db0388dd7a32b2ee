//! Timed phase transitions, one cancellable chain per request.
//!
//! Every request gets exactly one chain, started at creation. The chain
//! sleeps toward each deadline (relative to creation, not to the previous
//! step) and applies the corresponding transition, checking its
//! cancellation token between steps. A sweeper task evicts completed
//! requests after a retention window and is the only other writer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use super::metrics::OrchestratorMetrics;
use super::models::RequestStatus;
use super::store::RequestStore;
use crate::config::OrchestratorConfig;
use crate::errors::OrchestratorError;

// Artifacts appended at each producing transition, in append order.
pub const ARCHITECTING_ARTIFACTS: &[&str] = &["architecture_diagram.png", "technical_spec.md"];
pub const IMPLEMENTING_ARTIFACTS: &[&str] = &["docker-compose.yml", "src/main.py", "README.md"];
pub const COMPLETED_ARTIFACTS: &[&str] = &["deployment_guide.md", "test_suite.py"];

/// How many experts go active at the analyzing transition.
const ANALYZING_EXPERTS: usize = 2;

/// Deadlines for the four transitions, each relative to request creation.
#[derive(Debug, Clone, Copy)]
pub struct PhaseSchedule {
    pub deadlines: [Duration; 4],
}

impl PhaseSchedule {
    pub fn from_config(config: &OrchestratorConfig) -> Self {
        let secs = config.phase_delays_secs;
        Self {
            deadlines: secs.map(Duration::from_secs),
        }
    }

    fn steps(&self) -> [(Duration, RequestStatus); 4] {
        [
            (self.deadlines[0], RequestStatus::Analyzing),
            (self.deadlines[1], RequestStatus::Architecting),
            (self.deadlines[2], RequestStatus::Implementing),
            (self.deadlines[3], RequestStatus::Completed),
        ]
    }
}

/// Owns the per-request chains and the eviction sweeper.
pub struct LifecycleDriver {
    store: Arc<dyn RequestStore>,
    schedule: PhaseSchedule,
    metrics: Arc<OrchestratorMetrics>,
    chains: Mutex<HashMap<Uuid, CancellationToken>>,
}

impl LifecycleDriver {
    pub fn new(
        store: Arc<dyn RequestStore>,
        schedule: PhaseSchedule,
        metrics: Arc<OrchestratorMetrics>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            schedule,
            metrics,
            chains: Mutex::new(HashMap::new()),
        })
    }

    /// Start the transition chain for `id`. A second start for the same id
    /// is a no-op; one chain per request, exactly once.
    pub fn start(self: &Arc<Self>, id: Uuid) {
        let token = CancellationToken::new();
        {
            let mut chains = self.chains.lock().unwrap_or_else(|e| e.into_inner());
            if chains.contains_key(&id) {
                warn!("transition chain already running for {id}");
                return;
            }
            chains.insert(id, token.clone());
        }
        let driver = Arc::clone(self);
        tokio::spawn(async move {
            driver.run_chain(id, token).await;
        });
    }

    async fn run_chain(self: Arc<Self>, id: Uuid, token: CancellationToken) {
        let started = Instant::now();
        for (deadline, status) in self.schedule.steps() {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("transition chain for {id} cancelled at {status}");
                    break;
                }
                _ = sleep_until(started + deadline) => {
                    if self.apply_transition(id, status).is_err() {
                        break;
                    }
                }
            }
        }
        self.chains
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
    }

    fn apply_transition(&self, id: Uuid, status: RequestStatus) -> Result<(), OrchestratorError> {
        let result = self.store.update(id, &mut |request| {
            request.status = status;
            request.progress = status.progress();
            request.updated_at = Utc::now();
            match status {
                RequestStatus::Analyzing => {
                    request.active_experts =
                        request.experts.iter().take(ANALYZING_EXPERTS).cloned().collect();
                }
                RequestStatus::Architecting => {
                    request.active_experts = request.experts.clone();
                    request
                        .artifacts
                        .extend(ARCHITECTING_ARTIFACTS.iter().map(|a| a.to_string()));
                }
                RequestStatus::Implementing => {
                    request
                        .artifacts
                        .extend(IMPLEMENTING_ARTIFACTS.iter().map(|a| a.to_string()));
                }
                RequestStatus::Completed => {
                    request.active_experts.clear();
                    request
                        .artifacts
                        .extend(COMPLETED_ARTIFACTS.iter().map(|a| a.to_string()));
                }
                RequestStatus::Created => {}
            }
        });

        match result {
            Ok(_) => {
                info!("request {id} -> {status}");
                if status == RequestStatus::Completed {
                    self.metrics.requests_completed_total.inc();
                }
                Ok(())
            }
            Err(e) => {
                // Evicted or removed mid-chain; nothing left to drive.
                warn!("transition for {id} dropped: {e}");
                Err(e)
            }
        }
    }

    /// Cancel the chain for `id`. Returns whether a chain was running.
    pub fn cancel(&self, id: Uuid) -> bool {
        let chains = self.chains.lock().unwrap_or_else(|e| e.into_inner());
        match chains.get(&id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn active_chains(&self) -> usize {
        self.chains.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Spawn the TTL eviction sweeper. The returned token stops it.
    pub fn spawn_sweeper(self: &Arc<Self>, config: &OrchestratorConfig) -> CancellationToken {
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let driver = Arc::clone(self);
        let retention = chrono::Duration::seconds(config.retention_secs as i64);
        let interval = Duration::from_secs(config.sweep_interval_secs);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {
                        let cutoff = Utc::now() - retention;
                        match driver.store.evict_completed_before(cutoff) {
                            Ok(evicted) if !evicted.is_empty() => {
                                info!("evicted {} completed request(s)", evicted.len());
                                for id in evicted {
                                    driver.cancel(id);
                                }
                            }
                            Ok(_) => {}
                            Err(e) => warn!("eviction sweep failed: {e}"),
                        }
                    }
                }
            }
        });
        shutdown
    }
}
