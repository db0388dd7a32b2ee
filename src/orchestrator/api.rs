//! HTTP handlers for the orchestrator API.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use super::experts::{self, EXPERT_TAXONOMY, MAX_EXPERTS};
use super::lifecycle::LifecycleDriver;
use super::metrics::OrchestratorMetrics;
use super::models::{ArchRequest, ArtifactDescriptor, RequestStatus};
use super::store::{RequestFilter, RequestStore};
use crate::config::OrchestratorConfig;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub store: Arc<dyn RequestStore>,
    pub driver: Arc<LifecycleDriver>,
    pub metrics: Arc<OrchestratorMetrics>,
    pub config: OrchestratorConfig,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateRequestBody {
    pub project: Option<String>,
    pub description: Option<String>,
    pub requester: Option<String>,
    pub experts: Option<Vec<String>>,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub requester: Option<String>,
}

#[derive(Deserialize)]
pub struct FeedbackBody {
    pub expert: String,
    pub feedback: String,
    #[serde(default)]
    pub approved: bool,
}

// ── Error handling ────────────────────────────────────────────────────

pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({"error": message}))).into_response()
    }
}

impl From<crate::errors::OrchestratorError> for ApiError {
    fn from(err: crate::errors::OrchestratorError) -> Self {
        use crate::errors::OrchestratorError;
        match err {
            OrchestratorError::RequestNotFound { .. } => ApiError::NotFound(err.to_string()),
            OrchestratorError::MissingFields { .. } => ApiError::BadRequest(err.to_string()),
            other => {
                error!("internal orchestrator error: {other}");
                ApiError::Internal("Internal server error".to_string())
            }
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health))
        .route("/config", get(show_config))
        .route("/metrics", get(render_metrics))
        .route("/requests", get(list_requests).post(create_request))
        .route("/requests/{id}", get(get_request))
        .route("/requests/{id}/artifacts", get(get_artifacts))
        .route("/requests/{id}/feedback", post(submit_feedback))
        .route("/experts", get(expert_team))
}

// ── Helpers ───────────────────────────────────────────────────────────

/// Ids arrive as strings; anything that is not a UUID cannot name a
/// request, so it is a plain not-found rather than a malformed-request.
fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::NotFound(format!("Request {raw} not found")))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "config": {
            "experts": EXPERT_TAXONOMY.len(),
            "strategy": "keyword_match",
        }
    }))
}

async fn show_config(State(state): State<SharedState>) -> impl IntoResponse {
    Json(json!({
        "experts": {
            "team": EXPERT_TAXONOMY.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            "max_team_size": MAX_EXPERTS,
        },
        "phases": {
            "delays_secs": state.config.phase_delays_secs,
            "retention_secs": state.config.retention_secs,
        }
    }))
}

async fn render_metrics(State(state): State<SharedState>) -> Result<Response, ApiError> {
    let text = state.metrics.render(state.store.as_ref())?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        text,
    )
        .into_response())
}

async fn create_request(
    State(state): State<SharedState>,
    Json(body): Json<CreateRequestBody>,
) -> Result<Response, ApiError> {
    let filled = |field: &Option<String>| field.as_deref().is_some_and(|v| !v.is_empty());
    let missing: Vec<&str> = [
        ("project", filled(&body.project)),
        ("description", filled(&body.description)),
        ("requester", filled(&body.requester)),
    ]
    .iter()
    .filter(|(_, present)| !present)
    .map(|(name, _)| *name)
    .collect();
    if !missing.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    let description = body.description.unwrap_or_default();
    let experts = match body.experts {
        Some(explicit) => experts::normalize_team(explicit),
        None => experts::select_experts(&description),
    };

    let request = ArchRequest::new(
        body.project.unwrap_or_default(),
        description,
        body.requester.unwrap_or_default(),
        experts,
    );
    let id = request.id;
    info!("created request {id} with experts {:?}", request.experts);

    state.store.create(request)?;
    state.metrics.requests_created_total.inc();
    state.driver.start(id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "request_id": id,
            "status": RequestStatus::Created,
            "message": "Architecture request submitted to expert team",
        })),
    )
        .into_response())
}

async fn get_request(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<ArchRequest>, ApiError> {
    let request = state.store.get(parse_id(&id)?)?;
    Ok(Json(request))
}

async fn list_requests(
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let status = match &query.status {
        Some(raw) => Some(
            raw.parse::<RequestStatus>()
                .map_err(ApiError::BadRequest)?,
        ),
        None => None,
    };
    let filter = RequestFilter {
        status,
        requester: query.requester.clone(),
    };
    let requests = state.store.list(&filter)?;

    Ok(Json(json!({
        "requests": requests,
        "count": requests.len(),
        "filters": {
            "status": query.status,
            "requester": query.requester,
        }
    }))
    .into_response())
}

async fn get_artifacts(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let request = state.store.get(parse_id(&id)?)?;
    let artifacts: Vec<ArtifactDescriptor> = request
        .artifacts
        .iter()
        .map(|name| ArtifactDescriptor::for_request(request.id, name, request.updated_at))
        .collect();
    Ok(Json(json!({ "artifacts": artifacts })).into_response())
}

/// Acknowledgement only; a human-review extension point with no state
/// effect yet.
async fn submit_feedback(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(body): Json<FeedbackBody>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    state.store.get(id)?;
    info!(
        "expert {} provided feedback for {id} (approved: {}): {}",
        body.expert, body.approved, body.feedback
    );
    Ok(Json(json!({
        "message": "Feedback recorded",
        "expert": body.expert,
        "approved": body.approved,
    }))
    .into_response())
}

async fn expert_team(State(state): State<SharedState>) -> Result<Response, ApiError> {
    let in_flight = state.store.list(&RequestFilter::default())?;
    let team: Vec<serde_json::Value> = EXPERT_TAXONOMY
        .iter()
        .map(|(name, _)| {
            let active_requests = in_flight
                .iter()
                .filter(|r| {
                    r.status != RequestStatus::Completed
                        && r.experts.iter().any(|e| e == name)
                })
                .count();
            json!({
                "name": name,
                "status": "available",
                "specialties": experts::specialties(name),
                "active_requests": active_requests,
            })
        })
        .collect();

    Ok(Json(json!({
        "experts": team,
        "orchestration": {
            "strategy": "keyword_match",
            "max_team_size": MAX_EXPERTS,
        }
    }))
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::lifecycle::PhaseSchedule;
    use crate::orchestrator::store::InMemoryStore;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_state() -> SharedState {
        let store: Arc<dyn RequestStore> = Arc::new(InMemoryStore::new());
        let metrics = Arc::new(OrchestratorMetrics::new().unwrap());
        let config = OrchestratorConfig::default();
        let schedule = PhaseSchedule::from_config(&config);
        let driver = LifecycleDriver::new(store.clone(), schedule, metrics.clone());
        Arc::new(AppState {
            store,
            driver,
            metrics,
            config,
        })
    }

    fn test_router(state: SharedState) -> Router {
        api_router().with_state(state)
    }

    fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create(state: &SharedState, description: &str) -> String {
        let resp = test_router(state.clone())
            .oneshot(json_post(
                "/requests",
                json!({"project": "P", "description": description, "requester": "alice"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let json = body_json(resp).await;
        json["request_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn create_classifies_and_acknowledges() {
        let state = test_state();
        let id = create(&state, "need a new React UI and a Postgres API").await;

        let resp = test_router(state.clone())
            .oneshot(
                Request::builder()
                    .uri(format!("/requests/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "created");
        assert_eq!(json["progress"], 0);
        assert_eq!(
            json["experts"],
            json!(["frontend", "backend", "architecture"])
        );
    }

    #[tokio::test]
    async fn create_rejects_missing_fields() {
        let state = test_state();
        let resp = test_router(state)
            .oneshot(json_post("/requests", json!({"project": "P"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        let error = json["error"].as_str().unwrap();
        assert!(error.contains("description"));
        assert!(error.contains("requester"));
        assert!(!error.contains("project"));
    }

    #[tokio::test]
    async fn explicit_experts_are_normalized() {
        let state = test_state();
        let resp = test_router(state.clone())
            .oneshot(json_post(
                "/requests",
                json!({
                    "project": "P",
                    "description": "anything",
                    "requester": "alice",
                    "experts": ["backend", "backend"]
                }),
            ))
            .await
            .unwrap();
        let id = body_json(resp).await["request_id"]
            .as_str()
            .unwrap()
            .to_string();

        let request = state.store.get(id.parse().unwrap()).unwrap();
        assert_eq!(request.experts, vec!["backend", "architecture"]);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let state = test_state();
        let uris = [
            "/requests/unknown-id".to_string(),
            format!("/requests/{}", Uuid::new_v4()),
        ];
        for uri in &uris {
            let resp = test_router(state.clone())
                .oneshot(Request::builder().uri(uri.as_str()).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn list_filters_by_status_and_requester() {
        let state = test_state();
        create(&state, "a react ui").await;
        create(&state, "a docker deploy").await;

        let resp = test_router(state.clone())
            .oneshot(Request::builder().uri("/requests").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["count"], 2);

        let resp = test_router(state.clone())
            .oneshot(
                Request::builder()
                    .uri("/requests?status=completed")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["count"], 0);
        assert_eq!(json["filters"]["status"], "completed");

        let resp = test_router(state.clone())
            .oneshot(
                Request::builder()
                    .uri("/requests?requester=bob")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_json(resp).await["count"], 0);

        let resp = test_router(state)
            .oneshot(
                Request::builder()
                    .uri("/requests?status=bogus")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn artifacts_start_empty_with_descriptors_after_progress() {
        let state = test_state();
        let id = create(&state, "a system design").await;

        let resp = test_router(state.clone())
            .oneshot(
                Request::builder()
                    .uri(format!("/requests/{id}/artifacts"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["artifacts"], json!([]));

        // Simulate lifecycle progress, then descriptors carry name/url/type
        state
            .store
            .update(id.parse().unwrap(), &mut |r| {
                r.artifacts.push("technical_spec.md".to_string());
            })
            .unwrap();
        let resp = test_router(state)
            .oneshot(
                Request::builder()
                    .uri(format!("/requests/{id}/artifacts"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["artifacts"][0]["name"], "technical_spec.md");
        assert_eq!(json["artifacts"][0]["type"], "md");
        assert_eq!(
            json["artifacts"][0]["url"],
            format!("/artifacts/{id}/technical_spec.md")
        );
    }

    #[tokio::test]
    async fn feedback_is_acknowledged_without_state_effect() {
        let state = test_state();
        let id = create(&state, "a system design").await;
        let before = state.store.get(id.parse().unwrap()).unwrap();

        let resp = test_router(state.clone())
            .oneshot(json_post(
                &format!("/requests/{id}/feedback"),
                json!({"expert": "architecture", "feedback": "looks good", "approved": true}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["message"], "Feedback recorded");
        assert_eq!(json["approved"], true);

        let after = state.store.get(id.parse().unwrap()).unwrap();
        assert_eq!(before.status, after.status);
        assert_eq!(before.updated_at, after.updated_at);
    }

    #[tokio::test]
    async fn expert_team_reports_active_request_counts() {
        let state = test_state();
        create(&state, "a react ui").await;

        let resp = test_router(state)
            .oneshot(Request::builder().uri("/experts").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        let experts = json["experts"].as_array().unwrap();
        assert_eq!(experts.len(), EXPERT_TAXONOMY.len());

        let frontend = experts.iter().find(|e| e["name"] == "frontend").unwrap();
        assert_eq!(frontend["status"], "available");
        assert_eq!(frontend["active_requests"], 1);
        assert!(frontend["specialties"].as_array().unwrap().contains(&json!("React")));

        let devops = experts.iter().find(|e| e["name"] == "devops").unwrap();
        assert_eq!(devops["active_requests"], 0);
    }

    #[tokio::test]
    async fn metrics_expose_real_counters() {
        let state = test_state();
        create(&state, "a system design").await;

        let resp = test_router(state)
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("arch_requests_created_total 1"));
        assert!(text.contains("arch_requests_by_status{status=\"created\"} 1"));
    }

    #[tokio::test]
    async fn health_and_config_describe_the_instance() {
        let state = test_state();
        let resp = test_router(state.clone())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["config"]["experts"], EXPERT_TAXONOMY.len());

        let resp = test_router(state)
            .oneshot(Request::builder().uri("/config").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["phases"]["delays_secs"], json!([2, 5, 8, 12]));
        assert_eq!(json["experts"]["max_team_size"], MAX_EXPERTS);
    }
}
