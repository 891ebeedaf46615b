//! Cluster-wide fragmentation summary.

use std::collections::HashMap;

use tracing::debug;

use crate::config::FragmentationConfig;
use crate::fragmentation::node_fragmentation;
use crate::types::{
    ClusterFragmentationSummary, FragmentationStatus, FragmentationSummary, NodeFragmentation,
    NodeSnapshot, PodAllocation,
};

pub const CRITICAL_DETECTED: &str =
    "Critical fragmentation detected on some nodes. Consider pod consolidation or rebalancing.";
pub const IDLE_ALLOCATIONS: &str =
    "Some nodes have allocated GPUs with low utilization. Check if pods are idle.";
pub const USE_AFFINITY: &str =
    "Some nodes have fragmented GPU allocation. Consider using pod affinity/anti-affinity rules.";
pub const CLUSTER_HEALTHY: &str = "Cluster GPU allocation is healthy. No immediate action needed.";

/// Score returned for a cluster without nodes.
pub const EMPTY_CLUSTER_SCORE: f64 = 100.0;

/// Score every node and fold the results into a cluster summary.
///
/// Nodes missing from `pods_by_node` are scored as having no pods. Node
/// order in the result follows `nodes`.
pub fn analyze_cluster_fragmentation(
    nodes: &[NodeSnapshot],
    pods_by_node: &HashMap<String, Vec<PodAllocation>>,
    config: &FragmentationConfig,
) -> ClusterFragmentationSummary {
    let node_fragmentations: Vec<NodeFragmentation> = nodes
        .iter()
        .map(|node| {
            let pods = pods_by_node
                .get(&node.name)
                .map(Vec::as_slice)
                .unwrap_or_default();
            node_fragmentation(node, pods, config)
        })
        .collect();

    let cluster_score = cluster_score(&node_fragmentations);
    let summary = summarize(&node_fragmentations);
    let recommendations = cluster_recommendations(&node_fragmentations, config);

    debug!(
        nodes = node_fragmentations.len(),
        score = cluster_score,
        critical = summary.critical_nodes,
        "cluster fragmentation analyzed"
    );

    ClusterFragmentationSummary {
        cluster_fragmentation_score: cluster_score,
        total_nodes: node_fragmentations.len() as u32,
        node_fragmentations,
        recommendations,
        summary,
    }
}

/// Mean node score. An empty cluster reports [`EMPTY_CLUSTER_SCORE`] so
/// callers never see a NaN; it carries no health meaning.
pub fn cluster_score(frags: &[NodeFragmentation]) -> f64 {
    if frags.is_empty() {
        return EMPTY_CLUSTER_SCORE;
    }
    let total: f64 = frags.iter().map(|f| f.fragmentation_score).sum();
    total / frags.len() as f64
}

/// Tally node statuses and estimate stranded GPUs.
pub fn summarize(frags: &[NodeFragmentation]) -> FragmentationSummary {
    let mut summary = FragmentationSummary::default();
    let mut total_gpus: i64 = 0;

    for frag in frags {
        match frag.status {
            FragmentationStatus::Healthy => summary.healthy_nodes += 1,
            FragmentationStatus::Fragmented => summary.fragmented_nodes += 1,
            FragmentationStatus::Critical => summary.critical_nodes += 1,
        }
        total_gpus += i64::from(frag.total_gpus);

        // Free GPUs on an unhealthy node are hard to use.
        if frag.status != FragmentationStatus::Healthy && frag.available_gpus > 0 {
            summary.total_wasted_gpus += i64::from(frag.available_gpus);
        }
    }

    if total_gpus > 0 {
        summary.waste_percentage = summary.total_wasted_gpus as f64 / total_gpus as f64 * 100.0;
    }

    summary
}

/// Cluster-level recommendations. Checks are independent; the healthy
/// message only appears when none of them fire.
pub fn cluster_recommendations(
    frags: &[NodeFragmentation],
    config: &FragmentationConfig,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if frags.iter().any(|f| f.status == FragmentationStatus::Critical) {
        recommendations.push(CRITICAL_DETECTED.to_string());
    }

    if frags
        .iter()
        .any(|f| f.allocated_gpus > 0 && f.utilization < config.low_utilization_percent)
    {
        recommendations.push(IDLE_ALLOCATIONS.to_string());
    }

    if frags
        .iter()
        .any(|f| f.status == FragmentationStatus::Fragmented && f.available_gpus > 0)
    {
        recommendations.push(USE_AFFINITY.to_string());
    }

    if recommendations.is_empty() {
        recommendations.push(CLUSTER_HEALTHY.to_string());
    }

    recommendations
}
