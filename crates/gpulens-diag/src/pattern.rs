//! Pod allocation patterns and node-level recommendations.

use crate::config::FragmentationConfig;
use crate::types::{AllocationPattern, FragmentationStatus, NodeFragmentation, PodAllocation};

pub const MIGRATE_PODS: &str =
    "Critical fragmentation: Consider migrating some pods to other nodes";
pub const CONSOLIDATE_SMALL: &str =
    "Many small GPU allocations detected. Consider consolidating workloads";
pub const LIMITED_CONTIGUOUS: &str =
    "Limited contiguous GPU blocks. Difficult to schedule larger jobs";
pub const NODE_LOW_UTILIZATION: &str =
    "Low GPU utilization despite allocation. Check if pods are idle or waiting";
pub const NODE_HEALTHY: &str = "Node GPU allocation is healthy";

/// Describe how a node's GPUs are divided between its pods.
pub fn allocation_pattern(
    pods: &[PodAllocation],
    total_gpus: i32,
    config: &FragmentationConfig,
) -> AllocationPattern {
    let fully = pods
        .iter()
        .filter(|p| p.allocated_gpus >= config.full_pod_gpus)
        .count();
    let partial = pods
        .iter()
        .filter(|p| p.allocated_gpus > 0 && p.allocated_gpus < config.full_pod_gpus)
        .count();
    let held: i32 = pods.iter().map(|p| p.allocated_gpus).sum();

    AllocationPattern {
        fully_allocated_pods: fully as u32,
        partially_allocated_pods: partial as u32,
        gpu_sharing_enabled: false,
        largest_contiguous_gpu: total_gpus - held,
    }
}

/// Recommendations for a single node. Every matching check contributes,
/// in a fixed order; a node with no findings gets the healthy message.
pub fn node_recommendations(
    frag: &NodeFragmentation,
    pattern: &AllocationPattern,
    config: &FragmentationConfig,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if frag.status == FragmentationStatus::Critical {
        recommendations.push(MIGRATE_PODS.to_string());
    }

    if pattern.partially_allocated_pods > config.consolidate_partial_pods
        && frag.total_gpus >= config.large_node_gpus
    {
        recommendations.push(CONSOLIDATE_SMALL.to_string());
    }

    if frag.available_gpus > 0
        && frag.available_gpus < config.contiguous_block_gpus
        && pattern.largest_contiguous_gpu < config.contiguous_block_gpus
    {
        recommendations.push(LIMITED_CONTIGUOUS.to_string());
    }

    if frag.utilization < config.low_utilization_percent && frag.allocated_gpus > 0 {
        recommendations.push(NODE_LOW_UTILIZATION.to_string());
    }

    if recommendations.is_empty() {
        recommendations.push(NODE_HEALTHY.to_string());
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pods(sizes: &[i32]) -> Vec<PodAllocation> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, &gpus)| PodAllocation {
                pod_name: format!("job-{i}"),
                namespace: "research".to_string(),
                allocated_gpus: gpus,
            })
            .collect()
    }

    fn frag(
        status: FragmentationStatus,
        total: i32,
        allocated: i32,
        util: f64,
    ) -> NodeFragmentation {
        NodeFragmentation {
            node_name: "gpu-b3".to_string(),
            total_gpus: total,
            allocated_gpus: allocated,
            available_gpus: total - allocated,
            fragmentation_score: 0.0,
            status,
            utilization: util,
        }
    }

    #[test]
    fn pattern_splits_full_and_partial_pods() {
        let cfg = FragmentationConfig::default();
        let pattern = allocation_pattern(&pods(&[4, 8, 1, 2, 3, 0]), 32, &cfg);

        assert_eq!(pattern.fully_allocated_pods, 2);
        assert_eq!(pattern.partially_allocated_pods, 3);
        assert_eq!(pattern.largest_contiguous_gpu, 32 - 18);
        assert!(!pattern.gpu_sharing_enabled);
    }

    #[test]
    fn pattern_of_empty_node() {
        let cfg = FragmentationConfig::default();
        let pattern = allocation_pattern(&[], 8, &cfg);

        assert_eq!(pattern.fully_allocated_pods, 0);
        assert_eq!(pattern.partially_allocated_pods, 0);
        assert_eq!(pattern.largest_contiguous_gpu, 8);
    }

    #[test]
    fn healthy_node_gets_single_healthy_message() {
        let cfg = FragmentationConfig::default();
        let f = frag(FragmentationStatus::Healthy, 8, 8, 90.0);
        let p = allocation_pattern(&pods(&[4, 4]), 8, &cfg);

        assert_eq!(node_recommendations(&f, &p, &cfg), vec![NODE_HEALTHY.to_string()]);
    }

    #[test]
    fn critical_node_with_small_pods_collects_all_findings_in_order() {
        let cfg = FragmentationConfig::default();
        // 8 GPUs, 6 held by single-GPU pods, 2 free, mostly idle.
        let f = frag(FragmentationStatus::Critical, 8, 6, 10.0);
        let p = allocation_pattern(&pods(&[1, 1, 1, 1, 1, 1]), 8, &cfg);

        let recs = node_recommendations(&f, &p, &cfg);
        assert_eq!(
            recs,
            vec![
                MIGRATE_PODS.to_string(),
                CONSOLIDATE_SMALL.to_string(),
                LIMITED_CONTIGUOUS.to_string(),
                NODE_LOW_UTILIZATION.to_string(),
            ]
        );
    }

    #[test]
    fn consolidation_needs_a_large_node() {
        let cfg = FragmentationConfig::default();
        let f = frag(FragmentationStatus::Healthy, 4, 4, 95.0);
        let p = allocation_pattern(&pods(&[1, 1, 1, 1]), 4, &cfg);

        assert!(!node_recommendations(&f, &p, &cfg).contains(&CONSOLIDATE_SMALL.to_string()));
    }

    #[test]
    fn large_free_block_is_not_limited() {
        let cfg = FragmentationConfig::default();
        let f = frag(FragmentationStatus::Fragmented, 8, 4, 80.0);
        let p = allocation_pattern(&pods(&[4]), 8, &cfg);

        let recs = node_recommendations(&f, &p, &cfg);
        assert!(!recs.contains(&LIMITED_CONTIGUOUS.to_string()));
        assert_eq!(recs, vec![NODE_HEALTHY.to_string()]);
    }

    #[test]
    fn unallocated_node_is_not_flagged_idle() {
        let cfg = FragmentationConfig::default();
        let f = frag(FragmentationStatus::Fragmented, 8, 0, 0.0);
        let p = allocation_pattern(&[], 8, &cfg);

        assert!(!node_recommendations(&f, &p, &cfg).contains(&NODE_LOW_UTILIZATION.to_string()));
    }
}
