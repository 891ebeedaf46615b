//! gpulens-diag: GPU fragmentation and load-balance diagnostics.
//!
//! Given a snapshot of GPU nodes and the GPU pods running on them, this
//! crate scores how fragmented each node is, how evenly load is spread
//! across the cluster, and what an operator should do about it. It does
//! NOT fetch telemetry (that's the snapshot provider) and does NOT serve
//! HTTP (that's `gpulens-api`).
//!
//! # Components
//!
//! - **`fragmentation`**: Per-node fragmentation score and status
//! - **`pattern`**: Pod allocation pattern and node recommendations
//! - **`cluster`**: Cluster-wide fragmentation summary
//! - **`load`**: Per-node load score and cluster load balance
//! - **`engine`**: Provider-driven entry points with input policy
//! - **`provider`**: Snapshot provider trait and in-memory snapshots
//! - **`convert`**: Snapshot store records to engine inputs
//!
//! # Pipelines
//!
//! ```text
//! SnapshotProvider
//!   ├── nodes + pods ─→ score_node ─→ allocation_pattern ─→ cluster summary
//!   └── nodes ────────→ node_load ──→ load balance summary
//! ```
//!
//! The two pipelines share nothing and can run in either order.

pub mod cluster;
pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod fragmentation;
pub mod load;
pub mod pattern;
pub mod provider;
pub mod types;

pub use cluster::analyze_cluster_fragmentation;
pub use config::{DiagnosticConfig, FragmentationConfig, InputPolicy, LoadConfig};
pub use engine::{DiagnosticEngine, analyze_node_fragmentation};
pub use error::{DiagError, DiagResult};
pub use fragmentation::{partial_allocation_penalty, score_node};
pub use load::analyze_load_balance;
pub use provider::{SnapshotProvider, StaticSnapshot};
pub use types::*;
