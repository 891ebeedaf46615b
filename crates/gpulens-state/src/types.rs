//! Record types for the GPU Lens snapshot store.
//!
//! These mirror what the cluster telemetry pipeline reports about GPU
//! nodes and GPU pods. Values are taken as reported; the store does not
//! check that `gpu_allocation <= gpu_count` or that utilization is a
//! percentage.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Latest reported state of a GPU node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GpuNodeRecord {
    pub name: String,
    /// Number of GPUs installed on the node.
    pub gpu_count: i32,
    /// Number of GPUs currently allocated to pods.
    pub gpu_allocation: i32,
    /// Average GPU utilization across the node, in percent.
    pub gpu_utilization: f64,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// Unix timestamp (seconds) of the last report.
    #[serde(default)]
    pub updated_at: u64,
}

/// A pod that requested GPUs on a node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GpuPodRecord {
    pub name: String,
    pub namespace: String,
    /// Empty when the pod arrives as part of a node's pod report; the
    /// store fills it in from the node being replaced.
    #[serde(default)]
    pub node_name: String,
    /// GPUs allocated to this pod.
    pub gpu_allocated: i32,
    /// Whether the pod is still running. Finished pods are kept until the
    /// next full pod report for the node replaces them.
    #[serde(default = "default_running")]
    pub running: bool,
    #[serde(default)]
    pub updated_at: u64,
}

fn default_running() -> bool {
    true
}

impl GpuPodRecord {
    /// Build the composite key for the pods table.
    pub fn table_key(&self) -> String {
        format!("{}:{}/{}", self.node_name, self.namespace, self.name)
    }
}

/// Key prefix shared by every pod scheduled on `node_name`.
pub(crate) fn pod_prefix(node_name: &str) -> String {
    format!("{node_name}:")
}
