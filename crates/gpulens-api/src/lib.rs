//! gpulens-api: REST API for GPU Lens.
//!
//! Accepts GPU node and pod reports from the telemetry pipeline, stores
//! them in the snapshot store, and serves fragmentation and load-balance
//! diagnostics computed from the latest snapshot.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/nodes` | List GPU nodes |
//! | PUT | `/api/v1/nodes/{name}` | Upsert a GPU node |
//! | DELETE | `/api/v1/nodes/{name}` | Delete a node and its pods |
//! | GET | `/api/v1/nodes/{name}/pods` | List pods on a node |
//! | PUT | `/api/v1/nodes/{name}/pods` | Replace the pods on a node |
//! | GET | `/api/v1/nodes/fragmentation-analysis` | Cluster fragmentation |
//! | GET | `/api/v1/nodes/{name}/fragmentation` | Node fragmentation detail |
//! | GET | `/api/v1/nodes/load-balance-analysis` | Cluster load balance |
//! | GET | `/metrics` | Prometheus exposition |

pub mod handlers;
pub mod prometheus;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, put};
use gpulens_diag::{DiagnosticConfig, DiagnosticEngine};
use gpulens_state::StateStore;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: StateStore,
    pub engine: Arc<DiagnosticEngine<StateStore>>,
    /// Cluster name reported alongside every diagnostic.
    pub cluster: Arc<str>,
}

impl ApiState {
    pub fn new(store: StateStore, config: DiagnosticConfig, cluster: &str) -> Self {
        Self {
            engine: Arc::new(DiagnosticEngine::new(store.clone(), config)),
            store,
            cluster: Arc::from(cluster),
        }
    }
}

/// Build the complete API router (REST + metrics).
pub fn build_router(state: ApiState) -> Router {
    let api_routes = Router::new()
        .route("/nodes", get(handlers::list_nodes))
        .route(
            "/nodes/fragmentation-analysis",
            get(handlers::cluster_fragmentation),
        )
        .route(
            "/nodes/load-balance-analysis",
            get(handlers::load_balance),
        )
        .route(
            "/nodes/{name}",
            put(handlers::put_node).delete(handlers::delete_node),
        )
        .route(
            "/nodes/{name}/pods",
            get(handlers::list_pods).put(handlers::replace_pods),
        )
        .route("/nodes/{name}/fragmentation", get(handlers::node_fragmentation))
        .with_state(state.clone());

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::prometheus_metrics).with_state(state))
}
