//! Task tree maintenance: create, update, sync and the cascading
//! soft-delete / restore / permanent-delete operations.
//!
//! Every cascading call reads the full node set, computes the affected ids
//! with [`cascade::ChildIndex`], then writes back only the affected nodes.
//! A tree-wide write lock serializes those read-compute-write sequences for
//! callers sharing one [`TaskTreeService`].

pub mod cascade;
mod sync;

use crate::clock::Clock;
use crate::codec::{self, TaskNodeDto};
use crate::error::{TreeError, TreeResult};
use crate::store::TaskStore;
use crate::types::{ParentChange, TaskNode, TaskPatch, TaskStatus};
use cascade::ChildIndex;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

/// Entry point for all task tree operations.
pub struct TaskTreeService<S> {
    store: S,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl<S: TaskStore> TaskTreeService<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // A poisoned lock only means another writer panicked; the guard has no data.
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Visible nodes ordered by `order` ascending.
    pub fn list_tree(&self) -> TreeResult<Vec<TaskNodeDto>> {
        Ok(self.store.list_tree()?.iter().map(codec::to_dto).collect())
    }

    /// Soft-deleted nodes.
    pub fn list_deleted(&self) -> TreeResult<Vec<TaskNodeDto>> {
        Ok(self.store.list_deleted()?.iter().map(codec::to_dto).collect())
    }

    /// Create a node. The title must be non-blank; a missing id is generated.
    pub fn create(&self, mut dto: TaskNodeDto) -> TreeResult<TaskNodeDto> {
        if dto.title.as_deref().is_none_or(|t| t.trim().is_empty()) {
            return Err(TreeError::missing_field("title"));
        }
        if dto.id.as_deref().is_none_or(str::is_empty) {
            dto.id = Some(Uuid::now_v7().to_string());
        }

        let mut node = codec::to_entity(dto)?;
        if node.status.is_none() {
            node.status = Some(TaskStatus::Todo);
        }
        if node.created_at.is_none() {
            node.created_at = Some(self.clock.now());
        }

        let _guard = self.lock();
        self.store.save(&node)?;
        info!(task_id = %node.id, parent_id = ?node.parent_id, "Created task");
        Ok(codec::to_dto(&node))
    }

    /// Apply a wire-level partial update.
    ///
    /// The node is looked up before the payload is decoded, so an unknown id
    /// is `NOT_FOUND` whatever the payload holds.
    pub fn update(&self, id: &str, dto: TaskNodeDto) -> TreeResult<TaskNodeDto> {
        let _guard = self.lock();
        let node = self.existing(id)?;
        let patch = codec::to_patch(dto)?;
        let node = self.patch_node(node, patch)?;
        Ok(codec::to_dto(&node))
    }

    /// Apply field-level changes to an existing node.
    pub fn apply_patch(&self, id: &str, patch: TaskPatch) -> TreeResult<TaskNode> {
        let _guard = self.lock();
        let node = self.existing(id)?;
        self.patch_node(node, patch)
    }

    fn existing(&self, id: &str) -> TreeResult<TaskNode> {
        self.store
            .get(id)?
            .ok_or_else(|| TreeError::task_not_found(id))
    }

    /// Moving into `DONE` from any other status stamps `completed_at`;
    /// moving to `TODO` clears it. Other statuses leave it alone.
    /// Callers hold the write lock.
    fn patch_node(&self, mut node: TaskNode, patch: TaskPatch) -> TreeResult<TaskNode> {
        if patch.is_empty() {
            debug!(task_id = %node.id, "Empty patch, nothing to write");
            return Ok(node);
        }

        if let Some(title) = patch.title {
            node.title = title;
        }
        if let Some(node_type) = patch.node_type {
            node.node_type = node_type;
        }
        match patch.parent {
            Some(ParentChange::Detach) => node.parent_id = None,
            Some(ParentChange::Attach(parent_id)) => node.parent_id = Some(parent_id),
            None => {}
        }
        if let Some(order) = patch.order {
            node.order = order;
        }
        if let Some(is_expanded) = patch.is_expanded {
            node.is_expanded = Some(is_expanded);
        }
        if let Some(content) = patch.content {
            node.content = Some(content);
        }
        if let Some(minutes) = patch.work_duration_minutes {
            node.work_duration_minutes = Some(minutes);
        }
        if let Some(scheduled_at) = patch.scheduled_at {
            node.scheduled_at = Some(scheduled_at);
        }
        if let Some(color) = patch.color {
            node.color = Some(color);
        }

        if let Some(new_status) = patch.status {
            let old_status = node.status;
            node.status = Some(new_status);
            if new_status.is_terminal() && old_status != Some(new_status) {
                node.completed_at = Some(self.clock.now());
            } else if new_status.is_initial() {
                node.completed_at = None;
            }
        }

        self.store.save(&node)?;
        debug!(task_id = %node.id, status = ?node.status, "Updated task");
        Ok(node)
    }

    /// Mark `id` and every descendant deleted with one shared timestamp.
    pub fn soft_delete(&self, id: &str) -> TreeResult<()> {
        let _guard = self.lock();
        if self.store.get(id)?.is_none() {
            return Err(TreeError::task_not_found(id));
        }

        let all = self.store.list_all()?;
        let affected: HashSet<String> = ChildIndex::build(&all)
            .descendants(id)
            .into_iter()
            .collect();
        let now = self.clock.now();

        let changed: Vec<TaskNode> = all
            .into_iter()
            .filter(|n| affected.contains(&n.id))
            .map(|mut n| {
                n.is_deleted = true;
                n.deleted_at = Some(now);
                n
            })
            .collect();

        self.store.save_all(&changed)?;
        info!(task_id = %id, affected = changed.len(), "Soft-deleted subtree");
        Ok(())
    }

    /// Restore `id`, its descendants, and any deleted ancestors.
    ///
    /// An unknown id is a silent no-op.
    pub fn restore(&self, id: &str) -> TreeResult<()> {
        let _guard = self.lock();
        let all = self.store.list_all()?;

        let affected: HashSet<String> = {
            let index = ChildIndex::build(&all);
            let mut ids: HashSet<String> = index.descendants(id).into_iter().collect();
            ids.extend(index.deleted_ancestors(id));
            ids
        };

        let changed: Vec<TaskNode> = all
            .into_iter()
            .filter(|n| affected.contains(&n.id))
            .map(|mut n| {
                n.is_deleted = false;
                n.deleted_at = None;
                n
            })
            .collect();

        if changed.is_empty() {
            debug!(task_id = %id, "Restore matched no tasks");
            return Ok(());
        }

        self.store.save_all(&changed)?;
        info!(task_id = %id, affected = changed.len(), "Restored tasks");
        Ok(())
    }

    /// Remove `id` and every descendant for good, whatever their deleted state.
    ///
    /// An unknown id is a silent no-op.
    pub fn permanent_delete(&self, id: &str) -> TreeResult<()> {
        let _guard = self.lock();
        let all = self.store.list_all()?;
        let ids = ChildIndex::build(&all).descendants(id);

        let removed = self.store.delete_all_by_ids(&ids)?;
        info!(task_id = %id, removed, "Permanently deleted subtree");
        Ok(())
    }
}
