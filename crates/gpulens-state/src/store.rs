//! StateStore: redb-backed snapshot persistence for GPU Lens.
//!
//! Provides typed CRUD operations over GPU node and GPU pod records. All
//! values are JSON-serialized into redb's `&[u8]` value columns. The store
//! supports both on-disk and in-memory backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe snapshot store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent snapshot store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "snapshot store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory snapshot store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory snapshot store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(GPU_NODES).map_err(map_err!(Table))?;
        txn.open_table(GPU_PODS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Nodes ──────────────────────────────────────────────────────

    /// Insert or update a GPU node record.
    pub fn put_node(&self, node: &GpuNodeRecord) -> StateResult<()> {
        let value = serde_json::to_vec(node).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(GPU_NODES).map_err(map_err!(Table))?;
            table
                .insert(node.name.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(node = %node.name, "gpu node stored");
        Ok(())
    }

    /// Get a GPU node by name.
    pub fn get_node(&self, name: &str) -> StateResult<Option<GpuNodeRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(GPU_NODES).map_err(map_err!(Table))?;
        match table.get(name).map_err(map_err!(Read))? {
            Some(guard) => {
                let node: GpuNodeRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(node))
            }
            None => Ok(None),
        }
    }

    /// List all GPU nodes, ordered by name.
    pub fn list_nodes(&self) -> StateResult<Vec<GpuNodeRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(GPU_NODES).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let node: GpuNodeRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(node);
        }
        Ok(results)
    }

    /// Delete a node and every pod recorded on it. Returns true if the node existed.
    pub fn delete_node(&self, name: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut nodes = txn.open_table(GPU_NODES).map_err(map_err!(Table))?;
            existed = nodes.remove(name).map_err(map_err!(Write))?.is_some();

            let mut pods = txn.open_table(GPU_PODS).map_err(map_err!(Table))?;
            let stale = pod_keys_for_node(&pods, name)?;
            for key in &stale {
                pods.remove(key.as_str()).map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(node = %name, existed, "gpu node deleted");
        Ok(existed)
    }

    // ── Pods ───────────────────────────────────────────────────────

    /// Insert or update a single pod record.
    pub fn put_pod(&self, pod: &GpuPodRecord) -> StateResult<()> {
        let key = pod.table_key();
        let value = serde_json::to_vec(pod).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(GPU_PODS).map_err(map_err!(Table))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// List every pod record on a node, running or not.
    pub fn list_pods_for_node(&self, node_name: &str) -> StateResult<Vec<GpuPodRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(GPU_PODS).map_err(map_err!(Table))?;
        Ok(pods_for_node(&table, node_name)?
            .into_iter()
            .map(|(_, pod)| pod)
            .collect())
    }

    /// List the running pods on a node that hold at least one GPU.
    pub fn list_active_pods_for_node(&self, node_name: &str) -> StateResult<Vec<GpuPodRecord>> {
        let mut pods = self.list_pods_for_node(node_name)?;
        pods.retain(|p| p.running && p.gpu_allocated > 0);
        Ok(pods)
    }

    /// Replace every pod record on a node with `pods` in one transaction.
    ///
    /// Returns `None` without writing anything if the node is not stored.
    /// Pods whose `node_name` differs from `node_name` are stored under
    /// `node_name` anyway; the path decides ownership.
    pub fn replace_pods_for_node(
        &self,
        node_name: &str,
        pods: &[GpuPodRecord],
    ) -> StateResult<Option<u32>> {
        let mut encoded = Vec::with_capacity(pods.len());
        for pod in pods {
            let mut pod = pod.clone();
            pod.node_name = node_name.to_string();
            let value = serde_json::to_vec(&pod).map_err(map_err!(Serialize))?;
            encoded.push((pod.table_key(), value));
        }

        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let nodes = txn.open_table(GPU_NODES).map_err(map_err!(Table))?;
            if nodes.get(node_name).map_err(map_err!(Read))?.is_none() {
                debug!(node = %node_name, "pod report for unknown node ignored");
                return Ok(None);
            }

            let mut table = txn.open_table(GPU_PODS).map_err(map_err!(Table))?;
            let stale = pod_keys_for_node(&table, node_name)?;
            for key in &stale {
                table.remove(key.as_str()).map_err(map_err!(Write))?;
            }
            for (key, value) in &encoded {
                table
                    .insert(key.as_str(), value.as_slice())
                    .map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(node = %node_name, count = encoded.len(), "gpu pods replaced");
        Ok(Some(encoded.len() as u32))
    }

    /// Delete all pod records on a node. Returns number deleted.
    pub fn delete_pods_for_node(&self, node_name: &str) -> StateResult<u32> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let count;
        {
            let mut table = txn.open_table(GPU_PODS).map_err(map_err!(Table))?;
            let stale = pod_keys_for_node(&table, node_name)?;
            count = stale.len() as u32;
            for key in &stale {
                table.remove(key.as_str()).map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(count)
    }
}

/// Decode the pods stored under `node_name`, with their keys.
///
/// The key prefix narrows the scan; the decoded `node_name` decides, since
/// node `a` shares the `a:` prefix with node `a:b`.
fn pods_for_node<T>(table: &T, node_name: &str) -> StateResult<Vec<(String, GpuPodRecord)>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    let prefix = pod_prefix(node_name);
    let mut pods = Vec::new();
    for entry in table.iter().map_err(map_err!(Read))? {
        let (key, value) = entry.map_err(map_err!(Read))?;
        if !key.value().starts_with(&prefix) {
            continue;
        }
        let pod: GpuPodRecord =
            serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
        if pod.node_name == node_name {
            pods.push((key.value().to_string(), pod));
        }
    }
    Ok(pods)
}

fn pod_keys_for_node<T>(table: &T, node_name: &str) -> StateResult<Vec<String>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    Ok(pods_for_node(table, node_name)?
        .into_iter()
        .map(|(key, _)| key)
        .collect())
}
