//! Diagnostic thresholds and weights.
//!
//! Every number the scoring functions compare against lives here. The
//! `Default` impls carry the production values; a `[diagnostics]` table in
//! `gpulens.toml` may override any subset of them.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// What to do with snapshots whose values are out of range
/// (`allocated_gpus` outside `0..=total_gpus`, utilization outside `0..=100`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InputPolicy {
    /// Score the values as reported. Scores may leave `0..=100`.
    Propagate,
    /// Pull values back into range before scoring.
    #[default]
    Clamp,
    /// Refuse to score the snapshot.
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct DiagnosticConfig {
    pub input_policy: InputPolicy,
    pub fragmentation: FragmentationConfig,
    pub load: LoadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FragmentationConfig {
    /// Points for completely unallocated capacity.
    pub unused_weight: f64,
    /// Points for capacity that is allocated but idle.
    pub idle_weight: f64,
    /// Points for a maximal small-allocation penalty.
    pub partial_weight: f64,
    /// Scores at or above this are `fragmented`.
    pub fragmented_threshold: f64,
    /// Scores at or above this are `critical`.
    pub critical_threshold: f64,
    /// Nodes with at least this many GPUs count as large.
    pub large_node_gpus: i32,
    /// Single-GPU pods tolerated on a large node before the large-node penalty.
    pub large_node_small_pods: usize,
    pub large_node_penalty: f64,
    /// Single-GPU pods tolerated on any node before the small-pod penalty.
    pub small_pods_limit: usize,
    pub small_pods_penalty: f64,
    /// Pods holding at least this many GPUs count as fully allocated.
    pub full_pod_gpus: i32,
    /// Partial pods tolerated on a large node before suggesting consolidation.
    pub consolidate_partial_pods: u32,
    /// Free blocks smaller than this are too small for large jobs.
    pub contiguous_block_gpus: i32,
    /// Utilization below this on an allocated node counts as idle.
    pub low_utilization_percent: f64,
}

impl Default for FragmentationConfig {
    fn default() -> Self {
        Self {
            unused_weight: 40.0,
            idle_weight: 40.0,
            partial_weight: 20.0,
            fragmented_threshold: 30.0,
            critical_threshold: 60.0,
            large_node_gpus: 8,
            large_node_small_pods: 2,
            large_node_penalty: 0.3,
            small_pods_limit: 4,
            small_pods_penalty: 0.4,
            full_pod_gpus: 4,
            consolidate_partial_pods: 3,
            contiguous_block_gpus: 4,
            low_utilization_percent: 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoadConfig {
    pub allocation_weight: f64,
    pub utilization_weight: f64,
    /// Distance from the mean load, in load points, beyond which a node is
    /// a hotspot (above) or idle (below). Fixed, not scaled by dispersion.
    pub hotspot_band: f64,
    /// Allocation-rate standard deviation above which variance is flagged.
    pub high_stddev: f64,
    /// Mean allocation rate below which the cluster is flagged as underused.
    pub low_mean_allocation: f64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            allocation_weight: 0.6,
            utilization_weight: 0.4,
            hotspot_band: 20.0,
            high_stddev: 20.0,
            low_mean_allocation: 40.0,
        }
    }
}

impl DiagnosticConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DiagnosticConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
