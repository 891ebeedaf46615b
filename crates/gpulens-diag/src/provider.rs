//! Snapshot providers.
//!
//! The engine never reaches for global state: whoever builds a
//! [`DiagnosticEngine`](crate::DiagnosticEngine) hands it a provider.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DiagResult;
use crate::types::{NodeSnapshot, PodAllocation};

/// Source of node and pod snapshots for one cluster.
pub trait SnapshotProvider {
    /// Every GPU node, in a stable order.
    fn list_gpu_nodes(&self) -> DiagResult<Vec<NodeSnapshot>>;

    /// A single GPU node by name.
    fn get_gpu_node(&self, name: &str) -> DiagResult<Option<NodeSnapshot>>;

    /// Running pods on `node_name` that hold GPUs.
    fn active_gpu_pods(&self, node_name: &str) -> DiagResult<Vec<PodAllocation>>;
}

impl<P: SnapshotProvider + ?Sized> SnapshotProvider for &P {
    fn list_gpu_nodes(&self) -> DiagResult<Vec<NodeSnapshot>> {
        (**self).list_gpu_nodes()
    }

    fn get_gpu_node(&self, name: &str) -> DiagResult<Option<NodeSnapshot>> {
        (**self).get_gpu_node(name)
    }

    fn active_gpu_pods(&self, node_name: &str) -> DiagResult<Vec<PodAllocation>> {
        (**self).active_gpu_pods(node_name)
    }
}

/// A fixed, in-memory snapshot. Also the on-disk format read by
/// `lensd analyze`:
///
/// ```json
/// {
///   "nodes": [
///     {"name": "gpu-a1", "total_gpus": 8, "allocated_gpus": 6, "utilization_percent": 71.5}
///   ],
///   "pods": {"gpu-a1": [{"pod_name": "train-0", "namespace": "ml", "allocated_gpus": 6}]}
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StaticSnapshot {
    pub nodes: Vec<NodeSnapshot>,
    #[serde(default)]
    pub pods: HashMap<String, Vec<PodAllocation>>,
}

impl StaticSnapshot {
    pub fn new(nodes: Vec<NodeSnapshot>, pods: HashMap<String, Vec<PodAllocation>>) -> Self {
        Self { nodes, pods }
    }

    /// Load a snapshot from a JSON file.
    pub fn from_json_file(path: &Path) -> DiagResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl SnapshotProvider for StaticSnapshot {
    fn list_gpu_nodes(&self) -> DiagResult<Vec<NodeSnapshot>> {
        Ok(self.nodes.clone())
    }

    fn get_gpu_node(&self, name: &str) -> DiagResult<Option<NodeSnapshot>> {
        Ok(self.nodes.iter().find(|n| n.name == name).cloned())
    }

    fn active_gpu_pods(&self, node_name: &str) -> DiagResult<Vec<PodAllocation>> {
        Ok(self.pods.get(node_name).cloned().unwrap_or_default())
    }
}
