//! REST API handlers.
//!
//! Ingestion handlers write through `StateStore`; diagnostic handlers run
//! the shared `DiagnosticEngine` over the stored snapshot. Everything
//! returns the `{success, data, error}` JSON envelope.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use tracing::{info, warn};

use gpulens_diag::DiagError;
use gpulens_state::{GpuNodeRecord, GpuPodRecord};

use crate::ApiState;

const NO_GPU_NODES: &str = "no GPU nodes found";

/// Response wrapper for consistent API format.
#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

/// A diagnostic tagged with the cluster it was computed for.
#[derive(Serialize)]
struct ClusterReport<T: Serialize> {
    cluster: String,
    #[serde(flatten)]
    report: T,
}

impl<T: Serialize> ClusterReport<T> {
    fn new(state: &ApiState, report: T) -> Self {
        Self {
            cluster: state.cluster.to_string(),
            report,
        }
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

fn diag_error_response(err: &DiagError) -> axum::response::Response {
    let status = match err {
        DiagError::NodeNotFound(_) => StatusCode::NOT_FOUND,
        DiagError::InvalidSnapshot { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        warn!(error = %err, "diagnostic failed");
    }
    error_response(&err.to_string(), status).into_response()
}

fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

// ── Nodes ──────────────────────────────────────────────────────

/// GET /api/v1/nodes
pub async fn list_nodes(State(state): State<ApiState>) -> impl IntoResponse {
    match state.store.list_nodes() {
        Ok(nodes) => ApiResponse::ok(nodes).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// PUT /api/v1/nodes/:name
pub async fn put_node(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Json(mut node): Json<GpuNodeRecord>,
) -> impl IntoResponse {
    node.name = name;
    if node.updated_at == 0 {
        node.updated_at = now_epoch();
    }

    match state.store.put_node(&node) {
        Ok(()) => ApiResponse::ok(node).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// DELETE /api/v1/nodes/:name
pub async fn delete_node(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.store.delete_node(&name) {
        Ok(true) => {
            info!(node = %name, "gpu node removed");
            ApiResponse::ok("deleted").into_response()
        }
        Ok(false) => error_response("node not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

// ── Pods ───────────────────────────────────────────────────────

/// GET /api/v1/nodes/:name/pods
pub async fn list_pods(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.store.list_pods_for_node(&name) {
        Ok(pods) => ApiResponse::ok(pods).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// PUT /api/v1/nodes/:name/pods
///
/// The body is the node's complete pod list; pods missing from it are
/// dropped from the store.
pub async fn replace_pods(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Json(mut pods): Json<Vec<GpuPodRecord>>,
) -> impl IntoResponse {
    let now = now_epoch();
    for pod in pods.iter_mut().filter(|p| p.updated_at == 0) {
        pod.updated_at = now;
    }

    match state.store.replace_pods_for_node(&name, &pods) {
        Ok(Some(count)) => ApiResponse::ok(serde_json::json!({
            "node": name,
            "pods": count,
        }))
        .into_response(),
        Ok(None) => error_response("node not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

// ── Diagnostics ────────────────────────────────────────────────

/// GET /api/v1/nodes/fragmentation-analysis
pub async fn cluster_fragmentation(State(state): State<ApiState>) -> impl IntoResponse {
    match state.engine.cluster_fragmentation() {
        Ok(summary) if summary.total_nodes == 0 => {
            error_response(NO_GPU_NODES, StatusCode::NOT_FOUND).into_response()
        }
        Ok(summary) => ApiResponse::ok(ClusterReport::new(&state, summary)).into_response(),
        Err(e) => diag_error_response(&e),
    }
}

/// GET /api/v1/nodes/:name/fragmentation
pub async fn node_fragmentation(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.engine.node_fragmentation(&name) {
        Ok(detail) => ApiResponse::ok(ClusterReport::new(&state, detail)).into_response(),
        Err(e) => diag_error_response(&e),
    }
}

/// GET /api/v1/nodes/load-balance-analysis
pub async fn load_balance(State(state): State<ApiState>) -> impl IntoResponse {
    match state.engine.load_balance() {
        Ok(summary) if summary.node_load_distribution.is_empty() => {
            error_response(NO_GPU_NODES, StatusCode::NOT_FOUND).into_response()
        }
        Ok(summary) => ApiResponse::ok(ClusterReport::new(&state, summary)).into_response(),
        Err(e) => diag_error_response(&e),
    }
}

// ── Prometheus ─────────────────────────────────────────────────

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    // A failing diagnostic drops its metrics from the scrape, not the scrape.
    let fragmentation = state
        .engine
        .cluster_fragmentation()
        .inspect_err(|e| warn!(error = %e, "fragmentation metrics unavailable"))
        .ok()
        .filter(|s| s.total_nodes > 0);
    let load = state
        .engine
        .load_balance()
        .inspect_err(|e| warn!(error = %e, "load-balance metrics unavailable"))
        .ok()
        .filter(|s| !s.node_load_distribution.is_empty());

    let body = crate::prometheus::render_prometheus(
        &state.cluster,
        fragmentation.as_ref(),
        load.as_ref(),
    );
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpulens_diag::{DiagnosticConfig, InputPolicy};
    use gpulens_state::StateStore;
    use std::collections::HashMap;

    fn test_state() -> ApiState {
        let store = StateStore::open_in_memory().unwrap();
        ApiState::new(store, DiagnosticConfig::default(), "test-cluster")
    }

    fn test_node(name: &str, count: i32, allocation: i32, utilization: f64) -> GpuNodeRecord {
        GpuNodeRecord {
            name: name.to_string(),
            gpu_count: count,
            gpu_allocation: allocation,
            gpu_utilization: utilization,
            labels: HashMap::new(),
            updated_at: 1000,
        }
    }

    fn test_pod(name: &str, gpus: i32) -> GpuPodRecord {
        GpuPodRecord {
            name: name.to_string(),
            namespace: "ml".to_string(),
            node_name: String::new(),
            gpu_allocated: gpus,
            running: true,
            updated_at: 0,
        }
    }

    #[tokio::test]
    async fn list_nodes_empty() {
        let state = test_state();
        let resp = list_nodes(State(state)).await;
        let resp = resp.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn put_node_uses_path_name() {
        let state = test_state();
        let resp = put_node(
            State(state.clone()),
            Path("gpu-a1".to_string()),
            Json(test_node("ignored", 8, 4, 50.0)),
        )
        .await;
        assert_eq!(resp.into_response().status(), StatusCode::OK);

        let stored = state.store.get_node("gpu-a1").unwrap().unwrap();
        assert_eq!(stored.gpu_count, 8);
        assert!(state.store.get_node("ignored").unwrap().is_none());
    }

    #[tokio::test]
    async fn put_node_stamps_missing_timestamp() {
        let state = test_state();
        let mut node = test_node("gpu-a1", 8, 4, 50.0);
        node.updated_at = 0;

        put_node(State(state.clone()), Path("gpu-a1".to_string()), Json(node)).await;
        assert!(state.store.get_node("gpu-a1").unwrap().unwrap().updated_at > 0);
    }

    #[tokio::test]
    async fn delete_nonexistent_node() {
        let state = test_state();
        let resp = delete_node(State(state), Path("nope".to_string())).await;
        assert_eq!(resp.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn replace_pods_requires_node() {
        let state = test_state();
        let resp = replace_pods(
            State(state),
            Path("nope".to_string()),
            Json(vec![test_pod("p", 1)]),
        )
        .await;
        assert_eq!(resp.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn replace_pods_assigns_node() {
        let state = test_state();
        state.store.put_node(&test_node("gpu-a1", 8, 2, 50.0)).unwrap();

        let resp = replace_pods(
            State(state.clone()),
            Path("gpu-a1".to_string()),
            Json(vec![test_pod("p0", 1), test_pod("p1", 1)]),
        )
        .await;
        assert_eq!(resp.into_response().status(), StatusCode::OK);

        let pods = state.store.list_pods_for_node("gpu-a1").unwrap();
        assert_eq!(pods.len(), 2);
        assert!(pods.iter().all(|p| p.node_name == "gpu-a1" && p.updated_at > 0));
    }

    #[tokio::test]
    async fn fragmentation_empty_cluster_is_not_found() {
        let state = test_state();
        let resp = cluster_fragmentation(State(state)).await;
        assert_eq!(resp.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn load_balance_empty_cluster_is_not_found() {
        let state = test_state();
        let resp = load_balance(State(state)).await;
        assert_eq!(resp.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn fragmentation_with_nodes() {
        let state = test_state();
        state.store.put_node(&test_node("gpu-a1", 8, 8, 95.0)).unwrap();

        let resp = cluster_fragmentation(State(state)).await;
        assert_eq!(resp.into_response().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn node_fragmentation_unknown_node() {
        let state = test_state();
        let resp = node_fragmentation(State(state), Path("nope".to_string())).await;
        assert_eq!(resp.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reject_policy_maps_to_unprocessable() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_node(&test_node("gpu-a1", 8, 12, 50.0)).unwrap();
        let config = DiagnosticConfig {
            input_policy: InputPolicy::Reject,
            ..DiagnosticConfig::default()
        };
        let state = ApiState::new(store, config, "test-cluster");

        let resp = load_balance(State(state.clone())).await;
        assert_eq!(resp.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);

        let resp = node_fragmentation(State(state), Path("gpu-a1".to_string())).await;
        assert_eq!(resp.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn prometheus_endpoint_returns_text() {
        let state = test_state();
        state.store.put_node(&test_node("gpu-a1", 8, 4, 50.0)).unwrap();

        let resp = prometheus_metrics(State(state)).await;
        let resp = resp.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
        assert!(content_type.contains("text/plain"));
    }
}
