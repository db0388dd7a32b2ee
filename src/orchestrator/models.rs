//! Core data types for architecture requests.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle phase of an architecture request. Strictly ordered; a request
/// only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Created,
    Analyzing,
    Architecting,
    Implementing,
    Completed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Created => "created",
            RequestStatus::Analyzing => "analyzing",
            RequestStatus::Architecting => "architecting",
            RequestStatus::Implementing => "implementing",
            RequestStatus::Completed => "completed",
        }
    }

    /// Percentage shown to clients for this phase.
    pub fn progress(&self) -> u8 {
        match self {
            RequestStatus::Created => 0,
            RequestStatus::Analyzing => 25,
            RequestStatus::Architecting => 50,
            RequestStatus::Implementing => 75,
            RequestStatus::Completed => 100,
        }
    }

    pub const ALL: [RequestStatus; 5] = [
        RequestStatus::Created,
        RequestStatus::Analyzing,
        RequestStatus::Architecting,
        RequestStatus::Implementing,
        RequestStatus::Completed,
    ];
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(RequestStatus::Created),
            "analyzing" => Ok(RequestStatus::Analyzing),
            "architecting" => Ok(RequestStatus::Architecting),
            "implementing" => Ok(RequestStatus::Implementing),
            "completed" => Ok(RequestStatus::Completed),
            other => Err(format!("unknown request status: {other}")),
        }
    }
}

/// One tracked architecture request.
///
/// Mutated only by its own transition chain after creation; `artifacts` is
/// append-only and `progress` never decreases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchRequest {
    pub id: Uuid,
    pub project: String,
    pub description: String,
    pub requester: String,
    pub experts: Vec<String>,
    pub status: RequestStatus,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub artifacts: Vec<String>,
    pub active_experts: Vec<String>,
}

impl ArchRequest {
    pub fn new(project: String, description: String, requester: String, experts: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            project,
            description,
            requester,
            experts,
            status: RequestStatus::Created,
            progress: 0,
            created_at: now,
            updated_at: now,
            artifacts: Vec::new(),
            active_experts: Vec::new(),
        }
    }
}

/// Descriptor for one produced artifact, as served by the artifacts query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

impl ArtifactDescriptor {
    pub fn for_request(request_id: Uuid, name: &str, created_at: DateTime<Utc>) -> Self {
        let kind = name.rsplit('.').next().unwrap_or(name).to_string();
        Self {
            name: name.to_string(),
            url: format!("/artifacts/{request_id}/{name}"),
            kind,
            created_at,
        }
    }
}
