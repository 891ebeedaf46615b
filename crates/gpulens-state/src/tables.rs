//! redb table definitions for the GPU Lens snapshot store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized records).

use redb::TableDefinition;

/// GPU node records keyed by `{node_name}`.
pub const GPU_NODES: TableDefinition<&str, &[u8]> = TableDefinition::new("gpu_nodes");

/// GPU pod records keyed by `{node_name}:{namespace}/{pod_name}`.
pub const GPU_PODS: TableDefinition<&str, &[u8]> = TableDefinition::new("gpu_pods");
