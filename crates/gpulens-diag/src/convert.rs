//! Type conversions between snapshot store records and engine inputs.
//!
//! Bridges `gpulens_state::{GpuNodeRecord, GpuPodRecord}` to the engine's
//! `NodeSnapshot` and `PodAllocation`, and lets a `StateStore` act as a
//! snapshot provider.

use gpulens_state::{GpuNodeRecord, GpuPodRecord, StateStore};

use crate::error::DiagResult;
use crate::provider::SnapshotProvider;
use crate::types::{NodeSnapshot, PodAllocation};

/// Convert a [`GpuNodeRecord`] to a [`NodeSnapshot`].
pub fn node_record_to_snapshot(node: &GpuNodeRecord) -> NodeSnapshot {
    NodeSnapshot {
        name: node.name.clone(),
        total_gpus: node.gpu_count,
        allocated_gpus: node.gpu_allocation,
        utilization_percent: node.gpu_utilization,
    }
}

/// Convert a [`GpuPodRecord`] to a [`PodAllocation`].
pub fn pod_record_to_allocation(pod: &GpuPodRecord) -> PodAllocation {
    PodAllocation {
        pod_name: pod.name.clone(),
        namespace: pod.namespace.clone(),
        allocated_gpus: pod.gpu_allocated,
    }
}

impl SnapshotProvider for StateStore {
    fn list_gpu_nodes(&self) -> DiagResult<Vec<NodeSnapshot>> {
        Ok(self.list_nodes()?.iter().map(node_record_to_snapshot).collect())
    }

    fn get_gpu_node(&self, name: &str) -> DiagResult<Option<NodeSnapshot>> {
        Ok(self.get_node(name)?.as_ref().map(node_record_to_snapshot))
    }

    fn active_gpu_pods(&self, node_name: &str) -> DiagResult<Vec<PodAllocation>> {
        Ok(self
            .list_active_pods_for_node(node_name)?
            .iter()
            .map(pod_record_to_allocation)
            .collect())
    }
}
