//! Request registry behind a storage trait.
//!
//! The orchestration logic only sees [`RequestStore`], so the in-memory map
//! can be swapped for a persistent backend without touching lifecycle or
//! handler code. The in-memory store guards everything with one mutex; no
//! cross-request invariant needs anything finer.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::models::{ArchRequest, RequestStatus};
use crate::errors::OrchestratorError;

/// Exact-match filters for listing requests.
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub requester: Option<String>,
}

impl RequestFilter {
    fn accepts(&self, request: &ArchRequest) -> bool {
        if let Some(status) = self.status
            && request.status != status
        {
            return false;
        }
        if let Some(requester) = &self.requester
            && &request.requester != requester
        {
            return false;
        }
        true
    }
}

pub trait RequestStore: Send + Sync {
    fn create(&self, request: ArchRequest) -> Result<(), OrchestratorError>;

    /// Snapshot of one request, `RequestNotFound` for unknown ids.
    fn get(&self, id: Uuid) -> Result<ArchRequest, OrchestratorError>;

    /// Snapshots of all matching requests, ordered by creation time.
    fn list(&self, filter: &RequestFilter) -> Result<Vec<ArchRequest>, OrchestratorError>;

    /// Mutate one request in place under the store's lock.
    fn update(
        &self,
        id: Uuid,
        mutate: &mut dyn FnMut(&mut ArchRequest),
    ) -> Result<ArchRequest, OrchestratorError>;

    fn remove(&self, id: Uuid) -> Result<bool, OrchestratorError>;

    /// Evict completed requests whose last update is older than `cutoff`,
    /// returning the evicted ids.
    fn evict_completed_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, OrchestratorError>;
}

/// Mutex-guarded map keyed by request id.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<HashMap<Uuid, ArchRequest>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, ArchRequest>>, OrchestratorError> {
        self.inner.lock().map_err(|_| OrchestratorError::StorePoisoned)
    }
}

impl RequestStore for InMemoryStore {
    fn create(&self, request: ArchRequest) -> Result<(), OrchestratorError> {
        self.lock()?.insert(request.id, request);
        Ok(())
    }

    fn get(&self, id: Uuid) -> Result<ArchRequest, OrchestratorError> {
        self.lock()?
            .get(&id)
            .cloned()
            .ok_or(OrchestratorError::RequestNotFound { id })
    }

    fn list(&self, filter: &RequestFilter) -> Result<Vec<ArchRequest>, OrchestratorError> {
        let mut requests: Vec<ArchRequest> = self
            .lock()?
            .values()
            .filter(|r| filter.accepts(r))
            .cloned()
            .collect();
        requests.sort_by_key(|r| (r.created_at, r.id));
        Ok(requests)
    }

    fn update(
        &self,
        id: Uuid,
        mutate: &mut dyn FnMut(&mut ArchRequest),
    ) -> Result<ArchRequest, OrchestratorError> {
        let mut guard = self.lock()?;
        let request = guard
            .get_mut(&id)
            .ok_or(OrchestratorError::RequestNotFound { id })?;
        mutate(request);
        Ok(request.clone())
    }

    fn remove(&self, id: Uuid) -> Result<bool, OrchestratorError> {
        Ok(self.lock()?.remove(&id).is_some())
    }

    fn evict_completed_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, OrchestratorError> {
        let mut guard = self.lock()?;
        let stale: Vec<Uuid> = guard
            .values()
            .filter(|r| r.status == RequestStatus::Completed && r.updated_at < cutoff)
            .map(|r| r.id)
            .collect();
        for id in &stale {
            guard.remove(id);
        }
        Ok(stale)
    }
}
