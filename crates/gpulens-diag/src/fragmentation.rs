//! Per-node fragmentation scoring.
//!
//! A node's score adds up three independent causes of stranded capacity:
//! - **Unused**: GPUs nobody has allocated
//! - **Idle**: GPUs allocated to pods that aren't using them
//! - **Partial**: many single-GPU pods, which break up the free space
//!
//! Each cause is a fraction in `0..=1` scaled by its weight, and the total
//! is capped at 100.

use crate::config::FragmentationConfig;
use crate::types::{FragmentationStatus, NodeFragmentation, NodeSnapshot, PodAllocation};

/// Penalty in `0..=1` for a pod mix dominated by single-GPU allocations.
pub fn partial_allocation_penalty(
    pods: &[PodAllocation],
    total_gpus: i32,
    config: &FragmentationConfig,
) -> f64 {
    if pods.is_empty() {
        return 0.0;
    }

    let small = pods.iter().filter(|p| p.allocated_gpus == 1).count();

    let mut penalty = 0.0;
    if total_gpus >= config.large_node_gpus && small > config.large_node_small_pods {
        penalty += config.large_node_penalty;
    }
    if small > config.small_pods_limit {
        penalty += config.small_pods_penalty;
    }

    penalty.clamp(0.0, 1.0)
}

/// Fragmentation score for one node, nominally in `0..=100`.
pub fn score_node(
    node: &NodeSnapshot,
    pods: &[PodAllocation],
    config: &FragmentationConfig,
) -> f64 {
    let allocation_rate = node.allocation_fraction();

    // Share of the node that is allocated but not busy.
    let utilization_gap = (allocation_rate * 100.0 - node.utilization_percent).max(0.0) / 100.0;

    let partial = partial_allocation_penalty(pods, node.total_gpus, config);

    let score = (1.0 - allocation_rate) * config.unused_weight
        + utilization_gap * config.idle_weight
        + partial * config.partial_weight;

    score.min(100.0)
}

/// Map a score onto its band. Lower bounds are inclusive.
pub fn classify(score: f64, config: &FragmentationConfig) -> FragmentationStatus {
    if score < config.fragmented_threshold {
        FragmentationStatus::Healthy
    } else if score < config.critical_threshold {
        FragmentationStatus::Fragmented
    } else {
        FragmentationStatus::Critical
    }
}

/// Score and classify one node.
pub fn node_fragmentation(
    node: &NodeSnapshot,
    pods: &[PodAllocation],
    config: &FragmentationConfig,
) -> NodeFragmentation {
    let score = score_node(node, pods, config);
    NodeFragmentation {
        node_name: node.name.clone(),
        total_gpus: node.total_gpus,
        allocated_gpus: node.allocated_gpus,
        available_gpus: node.available_gpus(),
        fragmentation_score: score,
        status: classify(score, config),
        utilization: node.utilization_percent,
    }
}
