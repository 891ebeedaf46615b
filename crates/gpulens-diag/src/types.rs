//! Input snapshots and derived report types.
//!
//! Inputs are what the snapshot provider hands to the engine. Everything
//! else is computed per call and owned by the caller; none of it is
//! persisted.

use serde::{Deserialize, Serialize};

// ── Inputs ────────────────────────────────────────────────────────

/// GPU capacity and usage of a single node at snapshot time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeSnapshot {
    pub name: String,
    pub total_gpus: i32,
    /// Intended to lie in `0..=total_gpus`; not checked here.
    pub allocated_gpus: i32,
    /// Intended to lie in `0.0..=100.0`; not checked here.
    pub utilization_percent: f64,
}

impl NodeSnapshot {
    pub fn available_gpus(&self) -> i32 {
        self.total_gpus - self.allocated_gpus
    }

    /// Allocated share of the node's GPUs as a fraction. Zero for a node
    /// without GPUs.
    pub fn allocation_fraction(&self) -> f64 {
        if self.total_gpus == 0 {
            0.0
        } else {
            f64::from(self.allocated_gpus) / f64::from(self.total_gpus)
        }
    }
}

/// GPUs held by one active pod on a node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PodAllocation {
    pub pod_name: String,
    pub namespace: String,
    pub allocated_gpus: i32,
}

// ── Fragmentation ─────────────────────────────────────────────────

/// Fragmentation band a node falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentationStatus {
    Healthy,
    Fragmented,
    Critical,
}

impl FragmentationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FragmentationStatus::Healthy => "healthy",
            FragmentationStatus::Fragmented => "fragmented",
            FragmentationStatus::Critical => "critical",
        }
    }
}

impl std::fmt::Display for FragmentationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fragmentation result for a single node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeFragmentation {
    pub node_name: String,
    pub total_gpus: i32,
    pub allocated_gpus: i32,
    pub available_gpus: i32,
    /// 0 = no fragmentation, 100 = severe.
    pub fragmentation_score: f64,
    pub status: FragmentationStatus,
    pub utilization: f64,
}

/// How a node's GPUs are split between its pods.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllocationPattern {
    pub fully_allocated_pods: u32,
    pub partially_allocated_pods: u32,
    /// Always false until pod metadata carries sharing information.
    pub gpu_sharing_enabled: bool,
    /// Approximation: total GPUs minus the GPUs held by pods. Free GPUs
    /// are assumed to form a single block.
    pub largest_contiguous_gpu: i32,
}

/// Single-node fragmentation report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeFragmentationDetail {
    #[serde(flatten)]
    pub fragmentation: NodeFragmentation,
    pub allocation_pattern: AllocationPattern,
    pub running_pods: Vec<PodAllocation>,
    pub recommendations: Vec<String>,
}

/// Status tally and waste estimate across the cluster.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FragmentationSummary {
    pub healthy_nodes: u32,
    pub fragmented_nodes: u32,
    pub critical_nodes: u32,
    /// Free GPUs sitting on nodes that are not healthy.
    pub total_wasted_gpus: i64,
    pub waste_percentage: f64,
}

/// Cluster-wide fragmentation report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterFragmentationSummary {
    /// Mean node score, or 100 when there are no nodes. The empty-cluster
    /// value means "nothing to report", not "fully healthy".
    pub cluster_fragmentation_score: f64,
    pub total_nodes: u32,
    pub node_fragmentations: Vec<NodeFragmentation>,
    pub recommendations: Vec<String>,
    pub summary: FragmentationSummary,
}

// ── Load balance ──────────────────────────────────────────────────

/// Weighted load of a single node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeLoad {
    pub node_name: String,
    pub allocation_rate: f64,
    pub utilization_rate: f64,
    pub load_score: f64,
}

/// Distribution of allocation rates across nodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LoadBalanceStats {
    pub avg_allocation_rate: f64,
    pub stddev_allocation: f64,
    pub max_allocation: f64,
    pub min_allocation: f64,
    pub variance: f64,
}

/// Cluster-wide load-balance report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoadBalanceSummary {
    /// 0-100, higher is better balanced. 100 when there are no nodes.
    pub load_balance_score: f64,
    pub node_load_distribution: Vec<NodeLoad>,
    pub hotspot_nodes: Vec<String>,
    pub idle_nodes: Vec<String>,
    pub recommendations: Vec<String>,
    pub statistics: LoadBalanceStats,
}
