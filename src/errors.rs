//! Typed error hierarchy for Beacon.
//!
//! Two top-level enums cover the two subsystems:
//! - `GatewayError` — webhook verification, routing, and delivery failures
//! - `OrchestratorError` — request registry and lifecycle failures

use thiserror::Error;
use uuid::Uuid;

/// Errors from the webhook gateway subsystem.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Signature missing or digest mismatch. Responses built from this
    /// variant never say which, to avoid leaking oracle information.
    #[error("signature verification failed")]
    SignatureInvalid,

    #[error("no endpoint configured for {path}")]
    EndpointNotConfigured { path: String },

    #[error("service {service} not in allow-list")]
    ServiceNotAllowed { service: String },

    /// A logical channel with no concrete destination identifier. Recoverable:
    /// the gateway skips delivery and still acknowledges the webhook.
    #[error("channel {channel} has no configured destination")]
    ChannelNotConfigured { channel: String },

    /// The notification sink rejected or failed a delivery. Isolated per
    /// attempt and never surfaced to the original webhook sender.
    #[error("notification delivery failed: {0}")]
    Sink(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors from the request lifecycle orchestrator subsystem.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("request {id} not found")]
    RequestNotFound { id: Uuid },

    #[error("missing required fields: {fields}")]
    MissingFields { fields: String },

    #[error("request store lock poisoned")]
    StorePoisoned,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
