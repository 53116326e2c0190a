//! Output formatting for CLI results: pretty JSON or an indented text tree.

use crate::codec::TaskNodeDto;
use clap::ValueEnum;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

/// Pretty JSON for any serializable result.
pub fn to_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

fn status_marker(status: Option<&str>) -> &'static str {
    match status {
        Some("DONE") => "[x]",
        Some("IN_PROGRESS") => "[~]",
        _ => "[ ]",
    }
}

fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// Format a node in short form for lists.
fn format_node_short(node: &TaskNodeDto, depth: usize) -> String {
    let id = node.id.as_deref().unwrap_or_default();
    let kind = match node.node_type.as_deref() {
        Some("task") | None => String::new(),
        Some(other) => format!(" ({})", other),
    };
    format!(
        "{}- {} {}{} `{}`\n",
        "  ".repeat(depth),
        status_marker(node.status.as_deref()),
        node.title.as_deref().unwrap_or_default(),
        kind,
        short_id(id),
    )
}

/// Render visible nodes as an indented outline.
///
/// Input order is kept among siblings. Nodes whose parent is not in the
/// list are shown at the top level.
pub fn format_tree_text(nodes: &[TaskNodeDto]) -> String {
    let ids: HashSet<&str> = nodes.iter().filter_map(|n| n.id.as_deref()).collect();
    let mut children: HashMap<&str, Vec<&TaskNodeDto>> = HashMap::new();
    let mut roots = Vec::new();

    for node in nodes {
        match node.parent_id.as_deref() {
            Some(parent) if ids.contains(parent) => {
                children.entry(parent).or_default().push(node)
            }
            _ => roots.push(node),
        }
    }

    let mut out = format!("# Tasks ({})\n\n", nodes.len());
    let mut visited = HashSet::new();

    // Nodes caught in a parent cycle are unreachable from any root; they
    // are started from directly after the real roots.
    for start in roots.into_iter().chain(nodes) {
        let mut stack = vec![(start, 0)];
        while let Some((node, depth)) = stack.pop() {
            let id = node.id.as_deref().unwrap_or_default();
            if !visited.insert(id) {
                continue;
            }
            out.push_str(&format_node_short(node, depth));
            if let Some(kids) = children.get(id) {
                stack.extend(kids.iter().rev().map(|k| (*k, depth + 1)));
            }
        }
    }

    out
}

/// Render soft-deleted nodes, one per line with their deletion time.
pub fn format_deleted_text(nodes: &[TaskNodeDto]) -> String {
    let mut out = format!("# Deleted ({})\n\n", nodes.len());
    for node in nodes {
        out.push_str(&format!(
            "- {} `{}` deleted {}\n",
            node.title.as_deref().unwrap_or_default(),
            short_id(node.id.as_deref().unwrap_or_default()),
            node.deleted_at.as_deref().unwrap_or("-"),
        ));
    }
    out
}
