//! Prometheus metrics for the orchestrator, computed from real state.

use prometheus::{Encoder, IntCounter, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};

use super::models::RequestStatus;
use super::store::{RequestFilter, RequestStore};
use crate::errors::OrchestratorError;

/// Counters and gauges owned by one orchestrator instance. Registered on a
/// private registry rather than the process-global one so tests can build
/// as many instances as they like.
pub struct OrchestratorMetrics {
    registry: Registry,
    pub requests_created_total: IntCounter,
    pub requests_completed_total: IntCounter,
    requests_by_status: IntGaugeVec,
    experts_active: IntGauge,
}

impl OrchestratorMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_created_total = IntCounter::new(
            "arch_requests_created_total",
            "Total number of architecture requests created",
        )?;
        let requests_completed_total = IntCounter::new(
            "arch_requests_completed_total",
            "Total number of architecture requests that reached completed",
        )?;
        let requests_by_status = IntGaugeVec::new(
            Opts::new(
                "arch_requests_by_status",
                "Architecture requests currently held, by status",
            ),
            &["status"],
        )?;
        let experts_active = IntGauge::new(
            "arch_experts_active",
            "Experts currently active across all in-flight requests",
        )?;

        registry.register(Box::new(requests_created_total.clone()))?;
        registry.register(Box::new(requests_completed_total.clone()))?;
        registry.register(Box::new(requests_by_status.clone()))?;
        registry.register(Box::new(experts_active.clone()))?;

        Ok(Self {
            registry,
            requests_created_total,
            requests_completed_total,
            requests_by_status,
            experts_active,
        })
    }

    /// Refresh the gauges from the store and render the exposition text.
    pub fn render(&self, store: &dyn RequestStore) -> Result<String, OrchestratorError> {
        let requests = store.list(&RequestFilter::default())?;

        for status in RequestStatus::ALL {
            let count = requests.iter().filter(|r| r.status == status).count();
            self.requests_by_status
                .with_label_values(&[status.as_str()])
                .set(count as i64);
        }
        let active: usize = requests.iter().map(|r| r.active_experts.len()).sum();
        self.experts_active.set(active as i64);

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| OrchestratorError::Other(anyhow::anyhow!("metrics encoding: {e}")))?;
        String::from_utf8(buffer)
            .map_err(|e| OrchestratorError::Other(anyhow::anyhow!("metrics encoding: {e}")))
    }
}
