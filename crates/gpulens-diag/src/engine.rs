//! Provider-driven diagnostic entry points.
//!
//! Reads snapshots from a [`SnapshotProvider`], applies the configured
//! [`InputPolicy`], and runs the pure analysis functions. The engine holds
//! no mutable state; one instance can serve concurrent requests.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::cluster::analyze_cluster_fragmentation;
use crate::config::{DiagnosticConfig, FragmentationConfig, InputPolicy};
use crate::error::{DiagError, DiagResult};
use crate::fragmentation::node_fragmentation;
use crate::load::analyze_load_balance;
use crate::pattern::{allocation_pattern, node_recommendations};
use crate::provider::SnapshotProvider;
use crate::types::{
    ClusterFragmentationSummary, LoadBalanceSummary, NodeFragmentationDetail, NodeSnapshot,
    PodAllocation,
};

/// Full fragmentation report for one node.
pub fn analyze_node_fragmentation(
    node: &NodeSnapshot,
    pods: &[PodAllocation],
    config: &FragmentationConfig,
) -> NodeFragmentationDetail {
    let fragmentation = node_fragmentation(node, pods, config);
    let pattern = allocation_pattern(pods, node.total_gpus, config);
    let recommendations = node_recommendations(&fragmentation, &pattern, config);

    NodeFragmentationDetail {
        fragmentation,
        allocation_pattern: pattern,
        running_pods: pods.to_vec(),
        recommendations,
    }
}

/// Runs diagnostics against snapshots from a provider.
pub struct DiagnosticEngine<P> {
    provider: P,
    config: DiagnosticConfig,
}

impl<P: SnapshotProvider> DiagnosticEngine<P> {
    pub fn new(provider: P, config: DiagnosticConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &DiagnosticConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Cluster-wide fragmentation over every GPU node.
    pub fn cluster_fragmentation(&self) -> DiagResult<ClusterFragmentationSummary> {
        let nodes = self.checked_nodes()?;

        let mut pods_by_node = HashMap::with_capacity(nodes.len());
        for node in &nodes {
            let pods = self.provider.active_gpu_pods(&node.name)?;
            pods_by_node.insert(node.name.clone(), pods);
        }

        Ok(analyze_cluster_fragmentation(
            &nodes,
            &pods_by_node,
            &self.config.fragmentation,
        ))
    }

    /// Fragmentation detail for a single node.
    pub fn node_fragmentation(&self, name: &str) -> DiagResult<NodeFragmentationDetail> {
        let node = self
            .provider
            .get_gpu_node(name)?
            .ok_or_else(|| DiagError::NodeNotFound(name.to_string()))?;
        let node = apply_input_policy(node, self.config.input_policy)?;
        let pods = self.provider.active_gpu_pods(name)?;
        let held: i32 = pods.iter().map(|p| p.allocated_gpus).sum();

        debug!(node = %name, pods = pods.len(), "analyzing node fragmentation");
        let mut detail = analyze_node_fragmentation(&node, &pods, &self.config.fragmentation);

        if held > node.total_gpus {
            let reason = format!("pods hold {held} GPUs of {}", node.total_gpus);
            match self.config.input_policy {
                InputPolicy::Propagate => {}
                InputPolicy::Reject => {
                    return Err(DiagError::InvalidSnapshot {
                        node: node.name,
                        reason,
                    });
                }
                InputPolicy::Clamp => {
                    warn!(node = %name, %reason, "clamping free GPU block");
                    detail.allocation_pattern.largest_contiguous_gpu = 0;
                }
            }
        }

        Ok(detail)
    }

    /// Load balance over every GPU node.
    pub fn load_balance(&self) -> DiagResult<LoadBalanceSummary> {
        let nodes = self.checked_nodes()?;
        Ok(analyze_load_balance(&nodes, &self.config.load))
    }

    fn checked_nodes(&self) -> DiagResult<Vec<NodeSnapshot>> {
        self.provider
            .list_gpu_nodes()?
            .into_iter()
            .map(|node| apply_input_policy(node, self.config.input_policy))
            .collect()
    }
}

/// Describe why a snapshot is out of range, if it is.
fn out_of_range(node: &NodeSnapshot) -> Option<String> {
    if node.total_gpus < 0 {
        return Some(format!("total_gpus {} is negative", node.total_gpus));
    }
    if node.allocated_gpus < 0 || node.allocated_gpus > node.total_gpus {
        return Some(format!(
            "allocated_gpus {} outside 0..={}",
            node.allocated_gpus, node.total_gpus
        ));
    }
    if !(0.0..=100.0).contains(&node.utilization_percent) {
        return Some(format!(
            "utilization_percent {} outside 0..=100",
            node.utilization_percent
        ));
    }
    None
}

/// Apply `policy` to a single snapshot.
pub fn apply_input_policy(
    mut node: NodeSnapshot,
    policy: InputPolicy,
) -> DiagResult<NodeSnapshot> {
    let Some(reason) = out_of_range(&node) else {
        return Ok(node);
    };

    match policy {
        InputPolicy::Propagate => Ok(node),
        InputPolicy::Reject => Err(DiagError::InvalidSnapshot {
            node: node.name,
            reason,
        }),
        InputPolicy::Clamp => {
            warn!(node = %node.name, %reason, "clamping out-of-range snapshot");
            node.total_gpus = node.total_gpus.max(0);
            node.allocated_gpus = node.allocated_gpus.clamp(0, node.total_gpus);
            node.utilization_percent = if node.utilization_percent.is_nan() {
                0.0
            } else {
                node.utilization_percent.clamp(0.0, 100.0)
            };
            Ok(node)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::EMPTY_CLUSTER_SCORE;
    use crate::load::EMPTY_CLUSTER_BALANCE;
    use crate::pattern::NODE_HEALTHY;
    use crate::provider::StaticSnapshot;
    use crate::types::FragmentationStatus;

    fn node(name: &str, total: i32, allocated: i32, util: f64) -> NodeSnapshot {
        NodeSnapshot {
            name: name.to_string(),
            total_gpus: total,
            allocated_gpus: allocated,
            utilization_percent: util,
        }
    }

    fn pod(name: &str, gpus: i32) -> PodAllocation {
        PodAllocation {
            pod_name: name.to_string(),
            namespace: "vision".to_string(),
            allocated_gpus: gpus,
        }
    }

    fn engine(
        nodes: Vec<NodeSnapshot>,
        policy: InputPolicy,
    ) -> DiagnosticEngine<StaticSnapshot> {
        let pods = HashMap::from([(
            "gpu-1".to_string(),
            vec![pod("detr-0", 1), pod("detr-1", 1), pod("detr-2", 1)],
        )]);
        let config = DiagnosticConfig {
            input_policy: policy,
            ..DiagnosticConfig::default()
        };
        DiagnosticEngine::new(StaticSnapshot::new(nodes, pods), config)
    }

    #[test]
    fn node_detail_bundles_pattern_and_recommendations() {
        let cfg = FragmentationConfig::default();
        let pods = vec![pod("a", 4), pod("b", 4)];
        let detail = analyze_node_fragmentation(&node("gpu-1", 8, 8, 95.0), &pods, &cfg);

        assert_eq!(detail.fragmentation.status, FragmentationStatus::Healthy);
        assert_eq!(detail.allocation_pattern.fully_allocated_pods, 2);
        assert_eq!(detail.allocation_pattern.largest_contiguous_gpu, 0);
        assert_eq!(detail.running_pods, pods);
        assert_eq!(detail.recommendations, vec![NODE_HEALTHY.to_string()]);
    }

    #[test]
    fn node_detail_serializes_flat() {
        let cfg = FragmentationConfig::default();
        let detail = analyze_node_fragmentation(&node("gpu-1", 8, 0, 0.0), &[], &cfg);
        let json = serde_json::to_value(&detail).unwrap();

        assert_eq!(json["node_name"], "gpu-1");
        assert_eq!(json["status"], "fragmented");
        assert_eq!(json["allocation_pattern"]["gpu_sharing_enabled"], false);
        assert!(json["running_pods"].as_array().unwrap().is_empty());
    }

    #[test]
    fn engine_reads_pods_from_provider() {
        let e = engine(vec![node("gpu-1", 8, 3, 100.0)], InputPolicy::Clamp);
        let detail = e.node_fragmentation("gpu-1").unwrap();

        assert_eq!(detail.running_pods.len(), 3);
        assert_eq!(detail.allocation_pattern.partially_allocated_pods, 3);
        assert_eq!(detail.allocation_pattern.largest_contiguous_gpu, 5);
    }

    #[test]
    fn engine_unknown_node() {
        let e = engine(vec![], InputPolicy::Clamp);
        assert!(matches!(
            e.node_fragmentation("gpu-9"),
            Err(DiagError::NodeNotFound(name)) if name == "gpu-9"
        ));
    }

    #[test]
    fn engine_empty_cluster_returns_sentinels() {
        let e = engine(vec![], InputPolicy::Clamp);

        let frag = e.cluster_fragmentation().unwrap();
        assert_eq!(frag.cluster_fragmentation_score, EMPTY_CLUSTER_SCORE);
        assert_eq!(frag.total_nodes, 0);

        let lb = e.load_balance().unwrap();
        assert_eq!(lb.load_balance_score, EMPTY_CLUSTER_BALANCE);
    }

    #[test]
    fn clamp_keeps_scores_in_range() {
        let e = engine(
            vec![node("gpu-1", 8, 12, 250.0), node("gpu-2", 8, -3, -10.0)],
            InputPolicy::Clamp,
        );

        let frag = e.cluster_fragmentation().unwrap();
        for n in &frag.node_fragmentations {
            assert!((0.0..=100.0).contains(&n.fragmentation_score));
        }
        assert_eq!(frag.node_fragmentations[0].allocated_gpus, 8);
        assert_eq!(frag.node_fragmentations[1].allocated_gpus, 0);
        assert_eq!(frag.node_fragmentations[1].utilization, 0.0);

        let lb = e.load_balance().unwrap();
        assert!((0.0..=100.0).contains(&lb.load_balance_score));
        assert_eq!(lb.statistics.max_allocation, 100.0);
    }

    #[test]
    fn reject_refuses_out_of_range_snapshot() {
        let e = engine(vec![node("gpu-1", 8, 12, 50.0)], InputPolicy::Reject);

        assert!(matches!(
            e.cluster_fragmentation(),
            Err(DiagError::InvalidSnapshot { node, .. }) if node == "gpu-1"
        ));
        assert!(e.load_balance().is_err());
        assert!(e.node_fragmentation("gpu-1").is_err());
    }

    #[test]
    fn reject_accepts_valid_snapshot() {
        let e = engine(vec![node("gpu-1", 8, 8, 100.0)], InputPolicy::Reject);
        assert!(e.cluster_fragmentation().is_ok());
    }

    #[test]
    fn propagate_scores_raw_values() {
        let e = engine(vec![node("gpu-1", 8, 16, 200.0)], InputPolicy::Propagate);
        let detail = e.node_fragmentation("gpu-1").unwrap();

        assert_eq!(detail.fragmentation.allocated_gpus, 16);
        assert_eq!(detail.fragmentation.available_gpus, -8);
        assert!(detail.fragmentation.fragmentation_score < 0.0);
    }

    fn overcommitted(policy: InputPolicy) -> DiagnosticEngine<StaticSnapshot> {
        let pods = HashMap::from([(
            "gpu-1".to_string(),
            vec![pod("llama-0", 4), pod("llama-1", 4), pod("llama-2", 2)],
        )]);
        let config = DiagnosticConfig {
            input_policy: policy,
            ..DiagnosticConfig::default()
        };
        let nodes = vec![node("gpu-1", 8, 8, 90.0)];
        DiagnosticEngine::new(StaticSnapshot::new(nodes, pods), config)
    }

    #[test]
    fn clamp_keeps_free_block_non_negative() {
        let detail = overcommitted(InputPolicy::Clamp)
            .node_fragmentation("gpu-1")
            .unwrap();
        assert_eq!(detail.allocation_pattern.largest_contiguous_gpu, 0);
        assert_eq!(detail.running_pods.len(), 3);
    }

    #[test]
    fn propagate_reports_overcommitted_free_block() {
        let detail = overcommitted(InputPolicy::Propagate)
            .node_fragmentation("gpu-1")
            .unwrap();
        assert_eq!(detail.allocation_pattern.largest_contiguous_gpu, -2);
    }

    #[test]
    fn reject_refuses_overcommitted_pods() {
        assert!(matches!(
            overcommitted(InputPolicy::Reject).node_fragmentation("gpu-1"),
            Err(DiagError::InvalidSnapshot { node, .. }) if node == "gpu-1"
        ));
    }

    #[test]
    fn clamp_replaces_nan_utilization() {
        let clamped = apply_input_policy(node("n", 4, 2, f64::NAN), InputPolicy::Clamp).unwrap();
        assert_eq!(clamped.utilization_percent, 0.0);
    }

    #[test]
    fn engine_works_through_a_reference() {
        let snapshot = StaticSnapshot::new(vec![node("gpu-1", 8, 4, 50.0)], HashMap::new());
        let e = DiagnosticEngine::new(&snapshot, DiagnosticConfig::default());
        assert_eq!(e.load_balance().unwrap().node_load_distribution.len(), 1);
    }
}
