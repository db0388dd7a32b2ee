//! Architecture Request Lifecycle Orchestrator.
//!
//! ## Overview
//!
//! The orchestrator accepts architecture requests, classifies them to a team
//! of named experts by keyword, and walks each request through a fixed,
//! timed phase sequence (created → analyzing → architecting → implementing
//! → completed), accumulating artifacts along the way. State lives in an
//! in-memory registry behind a store trait and is queryable over HTTP while
//! the phases run.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌─────────────────────────────────────────────────┐
//! │ Clients  │ ───────> │  server.rs  (axum Router, ServerConfig)         │
//! │          │ <─────── │    └─ api.rs  (handlers, AppState)              │
//! └──────────┘          │         │ create / query / feedback             │
//!                       │         v                                       │
//!                       │  experts.rs  (keyword taxonomy, classifier)     │
//!                       │  models.rs   (ArchRequest, RequestStatus)       │
//!                       │         │                                       │
//!                       │         v                                       │
//!                       │  store.rs    (RequestStore trait, in-memory)    │
//!                       │         ^                                       │
//!                       │         │ timed transitions                     │
//!                       │  lifecycle.rs (one cancellable chain/request,   │
//!                       │               TTL eviction sweeper)             │
//!                       │  metrics.rs  (prometheus counters & gauges)     │
//!                       └─────────────────────────────────────────────────┘
//! ```
//!
//! Each request owns exactly one transition chain, started at creation.
//! Readers always observe a consistent snapshot through the store; no
//! cross-request locking exists because no cross-request invariant does.

pub mod api;
pub mod experts;
pub mod lifecycle;
pub mod metrics;
pub mod models;
pub mod server;
pub mod store;
