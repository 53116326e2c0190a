//! Storage contract for task nodes.
//!
//! The store owns the authoritative snapshot. It knows nothing about trees:
//! cascades are computed by [`crate::tree`] from `list_all` and written back
//! through `save_all` / `delete_all_by_ids`.

use crate::types::{TaskFilter, TaskNode};
use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Keyed storage of task nodes.
pub trait TaskStore: Send + Sync {
    /// Get a node by id.
    fn get(&self, id: &str) -> Result<Option<TaskNode>>;

    /// Every node, deleted or not.
    fn list_all(&self) -> Result<Vec<TaskNode>>;

    fn list_where(&self, filter: &TaskFilter) -> Result<Vec<TaskNode>>;

    /// Insert or replace a node by id.
    fn save(&self, node: &TaskNode) -> Result<()>;

    /// Insert or replace several nodes. Implementations apply the batch atomically.
    fn save_all(&self, nodes: &[TaskNode]) -> Result<()>;

    /// Remove the given ids; unknown ids are ignored.
    fn delete_all_by_ids(&self, ids: &[String]) -> Result<usize>;

    /// Visible nodes ordered by `order` ascending (ties broken by id).
    fn list_tree(&self) -> Result<Vec<TaskNode>> {
        let mut nodes = self.list_where(&TaskFilter::Deleted(false))?;
        nodes.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        Ok(nodes)
    }

    /// Soft-deleted nodes, most recently deleted first.
    fn list_deleted(&self) -> Result<Vec<TaskNode>> {
        let mut nodes = self.list_where(&TaskFilter::Deleted(true))?;
        nodes.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at));
        Ok(nodes)
    }
}

/// In-process store backed by an ordered map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    nodes: Mutex<BTreeMap<String, TaskNode>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with nodes (later duplicates win).
    pub fn with_nodes(nodes: impl IntoIterator<Item = TaskNode>) -> Self {
        let map = nodes.into_iter().map(|n| (n.id.clone(), n)).collect();
        Self {
            nodes: Mutex::new(map),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TaskStore for MemoryStore {
    fn get(&self, id: &str) -> Result<Option<TaskNode>> {
        Ok(self.nodes.lock().unwrap().get(id).cloned())
    }

    fn list_all(&self) -> Result<Vec<TaskNode>> {
        Ok(self.nodes.lock().unwrap().values().cloned().collect())
    }

    fn list_where(&self, filter: &TaskFilter) -> Result<Vec<TaskNode>> {
        Ok(self
            .nodes
            .lock()
            .unwrap()
            .values()
            .filter(|n| filter.matches(n))
            .cloned()
            .collect())
    }

    fn save(&self, node: &TaskNode) -> Result<()> {
        self.nodes
            .lock()
            .unwrap()
            .insert(node.id.clone(), node.clone());
        Ok(())
    }

    fn save_all(&self, nodes: &[TaskNode]) -> Result<()> {
        let mut map = self.nodes.lock().unwrap();
        for node in nodes {
            map.insert(node.id.clone(), node.clone());
        }
        Ok(())
    }

    fn delete_all_by_ids(&self, ids: &[String]) -> Result<usize> {
        let mut map = self.nodes.lock().unwrap();
        Ok(ids.iter().filter(|id| map.remove(*id).is_some()).count())
    }
}
