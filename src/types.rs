//! Core types for the task tree.

use crate::error::TreeError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Node type assigned when a create request leaves it out.
pub const DEFAULT_NODE_TYPE: &str = "task";

/// Task status.
///
/// `Todo` is the initial status and `Done` the terminal one; both drive
/// `completed_at`. Any other status leaves `completed_at` alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Done => "DONE",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }

    pub fn is_initial(&self) -> bool {
        matches!(self, TaskStatus::Todo)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TreeError;

    /// Status names are matched exactly, the way they travel on the wire.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TODO" => Ok(TaskStatus::Todo),
            "IN_PROGRESS" => Ok(TaskStatus::InProgress),
            "DONE" => Ok(TaskStatus::Done),
            other => Err(TreeError::invalid_value(
                "status",
                format!("Unknown task status: {}", other),
            )),
        }
    }
}

/// A node in the task tree (project, task or sub-task).
///
/// Parent/child links are carried only by `parent_id`; nothing indexes them,
/// so tree-shaped questions are answered from a full snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskNode {
    pub id: String,
    pub node_type: String,
    pub title: String,
    pub parent_id: Option<String>,
    pub order: i32,
    pub status: Option<TaskStatus>,
    pub is_expanded: Option<bool>,
    pub is_deleted: bool,
    pub deleted_at: Option<NaiveDateTime>,
    pub created_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    pub scheduled_at: Option<NaiveDateTime>,
    pub content: Option<String>,
    pub work_duration_minutes: Option<i32>,
    pub color: Option<String>,
}

impl TaskNode {
    /// A visible root node with defaults for everything but id and title.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: DEFAULT_NODE_TYPE.to_string(),
            title: title.into(),
            parent_id: None,
            order: 0,
            status: Some(TaskStatus::Todo),
            is_expanded: None,
            is_deleted: false,
            deleted_at: None,
            created_at: None,
            completed_at: None,
            scheduled_at: None,
            content: None,
            work_duration_minutes: None,
            color: None,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// How an update changes a node's parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentChange {
    /// Make the node a root.
    Detach,
    /// Move the node under another node.
    Attach(String),
}

/// Field-level changes for an update.
///
/// `None` leaves a field as it is. Clearing the parent is spelled
/// `ParentChange::Detach`; no other field can be cleared through a patch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub node_type: Option<String>,
    pub parent: Option<ParentChange>,
    pub order: Option<i32>,
    pub status: Option<TaskStatus>,
    pub is_expanded: Option<bool>,
    pub content: Option<String>,
    pub work_duration_minutes: Option<i32>,
    pub scheduled_at: Option<NaiveDateTime>,
    pub color: Option<String>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }
}

/// Filters understood by [`crate::store::TaskStore::list_where`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFilter {
    /// Nodes whose soft-delete flag matches.
    Deleted(bool),
    /// Direct children of a node; `None` selects roots.
    Parent(Option<String>),
    Status(TaskStatus),
}

impl TaskFilter {
    pub fn matches(&self, node: &TaskNode) -> bool {
        match self {
            TaskFilter::Deleted(flag) => node.is_deleted == *flag,
            TaskFilter::Parent(parent) => node.parent_id == *parent,
            TaskFilter::Status(status) => node.status == Some(*status),
        }
    }
}
