//! Webhook Security & Routing Gateway.
//!
//! ## Overview
//!
//! The gateway receives third-party webhooks (generic service events,
//! alert-manager alerts, GitHub events), verifies their HMAC signatures
//! against the exact raw request bytes, resolves a destination through a
//! declarative rule set, and republishes them as formatted notifications.
//! A local misconfiguration (unmapped channel, missing route) degrades
//! gracefully: the sender is acknowledged and the gap is logged.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌─────────────────────────────────────────────────┐
//! │ Webhook  │ ───────> │  server.rs  (axum Router, ServerConfig)         │
//! │ senders  │ <─────── │    └─ api.rs  (route handlers, AppState)        │
//! └──────────┘          │         │ signature::verify() on raw Bytes      │
//!                       │         v                                       │
//!                       │  signature.rs  (HMAC-SHA-256, constant-time)    │
//!                       │         │                                       │
//!                       │         │ EndpointConfig::resolve_route()       │
//!                       │         v                                       │
//!                       │  routes.rs  (EndpointConfig, RouteRule)         │
//!                       │         │    └─ patterns.rs (trailing-* globs)  │
//!                       │         v                                       │
//!                       │  notify.rs  (Notification, NotificationSink)    │
//!                       └─────────────────────────────────────────────────┘
//! ```
//!
//! ## Terminal states per inbound request
//!
//! | Outcome                      | HTTP | Notification |
//! |------------------------------|------|--------------|
//! | bad or missing signature     | 401  | no           |
//! | endpoint not configured      | 404  | no           |
//! | service not in allow-list    | 403  | no           |
//! | no route matches             | 200  | no (info)    |
//! | channel unmapped             | 200  | no (warning) |
//! | routed                       | 200  | yes          |
//!
//! Sink failures are logged and never turn an accepted webhook into a 5xx:
//! the response is about ingestion, not delivery.

pub mod api;
pub mod notify;
pub mod patterns;
pub mod routes;
pub mod server;
pub mod signature;
