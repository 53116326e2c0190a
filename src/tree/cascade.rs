//! Cascade-set computation over a full snapshot of the tree.
//!
//! The store does not index parent/child links, so each cascading call builds
//! a transient `parent_id -> children` index from `list_all` and walks it.
//! Walks track visited ids: a cyclic `parent_id` chain (possible after a
//! careless sync) ends the walk instead of looping.

use crate::types::TaskNode;
use std::collections::{HashMap, HashSet};

/// Children of every node, keyed by parent id, in snapshot order.
pub struct ChildIndex<'a> {
    children: HashMap<&'a str, Vec<&'a str>>,
    by_id: HashMap<&'a str, &'a TaskNode>,
}

impl<'a> ChildIndex<'a> {
    pub fn build(nodes: &'a [TaskNode]) -> Self {
        let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut by_id = HashMap::with_capacity(nodes.len());
        for node in nodes {
            by_id.insert(node.id.as_str(), node);
            if let Some(parent) = node.parent_id.as_deref() {
                children.entry(parent).or_default().push(node.id.as_str());
            }
        }
        Self { children, by_id }
    }

    pub fn node(&self, id: &str) -> Option<&'a TaskNode> {
        self.by_id.get(id).copied()
    }

    pub fn children_of(&self, id: &str) -> &[&'a str] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `root` followed by every node reachable through child links, depth first.
    ///
    /// `root` is always included, even when no node carries that id.
    pub fn descendants(&self, root: &str) -> Vec<String> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut result = vec![root.to_string()];
        visited.insert(root);

        let mut stack: Vec<&str> = self.children_of(root).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                tracing::warn!(task_id = %current, root = %root, "Cycle in parent links, skipping revisit");
                continue;
            }
            result.push(current.to_string());
            stack.extend(self.children_of(current).iter().rev().copied());
        }

        result
    }

    /// Soft-deleted ancestors of `id`, nearest first.
    ///
    /// The walk passes through visible ancestors and stops at a root, at a
    /// dangling parent reference, or when it would revisit a node.
    pub fn deleted_ancestors(&self, id: &str) -> Vec<String> {
        let mut result = Vec::new();
        let Some(target) = self.node(id) else {
            return result;
        };

        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(target.id.as_str());

        let mut parent_id = target.parent_id.as_deref();
        while let Some(pid) = parent_id {
            if !visited.insert(pid) {
                tracing::warn!(task_id = %id, at = %pid, "Cycle in ancestor chain, stopping walk");
                break;
            }
            let Some(parent) = self.node(pid) else {
                break;
            };
            if parent.is_deleted {
                result.push(parent.id.clone());
            }
            parent_id = parent.parent_id.as_deref();
        }

        result
    }
}
