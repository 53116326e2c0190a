//! Conversion between the wire representation of a task node and [`TaskNode`].
//!
//! On the wire every field is a nullable string or primitive, timestamps use
//! the local ISO-8601 date-time form `YYYY-MM-DDTHH:MM:SS[.fffffffff]` with no
//! zone designator. Zoned inputs are accepted but lose their offset: a
//! trailing `Z` and anything from a `+` onwards are dropped before parsing.

use crate::error::{TreeError, TreeResult};
use crate::types::{DEFAULT_NODE_TYPE, ParentChange, TaskNode, TaskPatch, TaskStatus};
use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const DATE_TIME_FORMAT_SECONDS: &str = "%Y-%m-%dT%H:%M:%S";
const DATE_TIME_FORMAT_NO_SECONDS: &str = "%Y-%m-%dT%H:%M";

/// Wire form of a task node, used for create, update, sync and every read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskNodeDto {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub node_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub order: Option<i32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub is_expanded: Option<bool>,
    #[serde(default)]
    pub is_deleted: Option<bool>,
    #[serde(default)]
    pub deleted_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub scheduled_at: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub work_duration_minutes: Option<i32>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Parse a wire timestamp. Empty or absent input means "no timestamp".
pub fn parse_date_time(field: &str, raw: Option<&str>) -> TreeResult<Option<NaiveDateTime>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    if raw.is_empty() {
        return Ok(None);
    }

    let mut cleaned = raw.strip_suffix('Z').unwrap_or(raw);
    if let Some(idx) = cleaned.find('+') {
        cleaned = &cleaned[..idx];
    }

    NaiveDateTime::parse_from_str(cleaned, DATE_TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(cleaned, DATE_TIME_FORMAT_NO_SECONDS))
        .map(Some)
        .map_err(|_| {
            TreeError::invalid_value(field, format!("Invalid date format: {}", raw))
        })
}

/// Format a timestamp in the canonical local profile.
///
/// Seconds are always present; the fraction only when non-zero, with
/// trailing zeros dropped (`.5`, not `.500`).
pub fn format_date_time(dt: &NaiveDateTime) -> String {
    let mut out = dt.format(DATE_TIME_FORMAT_SECONDS).to_string();
    // Leap seconds carry nanos past 1e9.
    let nanos = dt.nanosecond() % 1_000_000_000;
    if nanos != 0 {
        let fraction = format!("{:09}", nanos);
        out.push('.');
        out.push_str(fraction.trim_end_matches('0'));
    }
    out
}

fn format_opt(dt: Option<&NaiveDateTime>) -> Option<String> {
    dt.map(format_date_time)
}

fn parse_status(raw: Option<&str>) -> TreeResult<Option<TaskStatus>> {
    raw.map(str::parse).transpose()
}

/// Empty parent references mean "root".
fn normalize_parent(parent_id: Option<String>) -> Option<String> {
    parent_id.filter(|p| !p.is_empty())
}

/// Encode a node for the wire.
pub fn to_dto(node: &TaskNode) -> TaskNodeDto {
    TaskNodeDto {
        id: Some(node.id.clone()),
        node_type: Some(node.node_type.clone()),
        title: Some(node.title.clone()),
        parent_id: node.parent_id.clone(),
        order: Some(node.order),
        status: node.status.map(|s| s.as_str().to_string()),
        is_expanded: node.is_expanded,
        is_deleted: Some(node.is_deleted),
        deleted_at: format_opt(node.deleted_at.as_ref()),
        created_at: format_opt(node.created_at.as_ref()),
        completed_at: format_opt(node.completed_at.as_ref()),
        scheduled_at: format_opt(node.scheduled_at.as_ref()),
        content: node.content.clone(),
        work_duration_minutes: node.work_duration_minutes,
        color: node.color.clone(),
    }
}

/// Decode a full node payload.
///
/// Used by sync, where every element must carry its own id and title, and by
/// create once the service has filled in any generated id.
pub fn to_entity(dto: TaskNodeDto) -> TreeResult<TaskNode> {
    let id = dto
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| TreeError::missing_field("id"))?;
    let title = dto.title.ok_or_else(|| TreeError::missing_field("title"))?;

    Ok(TaskNode {
        id,
        node_type: dto
            .node_type
            .unwrap_or_else(|| DEFAULT_NODE_TYPE.to_string()),
        title,
        parent_id: normalize_parent(dto.parent_id),
        order: dto.order.unwrap_or(0),
        status: parse_status(dto.status.as_deref())?,
        is_expanded: dto.is_expanded,
        is_deleted: dto.is_deleted.unwrap_or(false),
        deleted_at: parse_date_time("deletedAt", dto.deleted_at.as_deref())?,
        created_at: parse_date_time("createdAt", dto.created_at.as_deref())?,
        completed_at: parse_date_time("completedAt", dto.completed_at.as_deref())?,
        scheduled_at: parse_date_time("scheduledAt", dto.scheduled_at.as_deref())?,
        content: dto.content,
        work_duration_minutes: dto.work_duration_minutes,
        color: dto.color,
    })
}

/// Decode an update payload into field-level changes.
///
/// Null and absent fields both mean "leave unchanged". `parentId: ""` is the
/// one way to move a node back to the root. Fields an update cannot touch
/// (`id`, `isDeleted`, `deletedAt`, `createdAt`, `completedAt`) are ignored.
pub fn to_patch(dto: TaskNodeDto) -> TreeResult<TaskPatch> {
    let parent = dto.parent_id.map(|p| {
        if p.is_empty() {
            ParentChange::Detach
        } else {
            ParentChange::Attach(p)
        }
    });

    Ok(TaskPatch {
        title: dto.title,
        node_type: dto.node_type,
        parent,
        order: dto.order,
        status: parse_status(dto.status.as_deref())?,
        is_expanded: dto.is_expanded,
        content: dto.content,
        work_duration_minutes: dto.work_duration_minutes,
        scheduled_at: parse_date_time("scheduledAt", dto.scheduled_at.as_deref())?,
        color: dto.color,
    })
}
