//! Task node persistence.

use super::Database;
use crate::store::TaskStore;
use crate::types::{TaskFilter, TaskNode, TaskStatus};
use anyhow::Result;
use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};

const UPSERT_SQL: &str = "INSERT OR REPLACE INTO tasks (
        id, node_type, title, parent_id, sort_order, status, is_expanded,
        is_deleted, deleted_at, created_at, completed_at, scheduled_at,
        content, work_duration_minutes, color
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)";

pub fn parse_task_row(row: &Row) -> rusqlite::Result<TaskNode> {
    let status: Option<String> = row.get("status")?;
    let status = status
        .map(|s| s.parse::<TaskStatus>())
        .transpose()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                row.as_ref().column_index("status").unwrap_or(0),
                Type::Text,
                Box::new(e),
            )
        })?;

    Ok(TaskNode {
        id: row.get("id")?,
        node_type: row.get("node_type")?,
        title: row.get("title")?,
        parent_id: row.get("parent_id")?,
        order: row.get("sort_order")?,
        status,
        is_expanded: row.get("is_expanded")?,
        is_deleted: row.get("is_deleted")?,
        deleted_at: row.get("deleted_at")?,
        created_at: row.get("created_at")?,
        completed_at: row.get("completed_at")?,
        scheduled_at: row.get("scheduled_at")?,
        content: row.get("content")?,
        work_duration_minutes: row.get("work_duration_minutes")?,
        color: row.get("color")?,
    })
}

fn upsert_internal(conn: &Connection, node: &TaskNode) -> Result<()> {
    conn.execute(
        UPSERT_SQL,
        params![
            node.id,
            node.node_type,
            node.title,
            node.parent_id,
            node.order,
            node.status.map(|s| s.as_str()),
            node.is_expanded,
            node.is_deleted,
            node.deleted_at,
            node.created_at,
            node.completed_at,
            node.scheduled_at,
            node.content,
            node.work_duration_minutes,
            node.color,
        ],
    )?;
    Ok(())
}

fn query_tasks(conn: &Connection, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<TaskNode>> {
    let mut stmt = conn.prepare(sql)?;
    let tasks = stmt
        .query_map(args, parse_task_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tasks)
}

impl TaskStore for Database {
    fn get(&self, id: &str) -> Result<Option<TaskNode>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM tasks WHERE id = ?1")?;

            let result = stmt.query_row(params![id], parse_task_row);

            match result {
                Ok(task) => Ok(Some(task)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn list_all(&self) -> Result<Vec<TaskNode>> {
        self.with_conn(|conn| query_tasks(conn, "SELECT * FROM tasks", &[]))
    }

    fn list_where(&self, filter: &TaskFilter) -> Result<Vec<TaskNode>> {
        self.with_conn(|conn| match filter {
            TaskFilter::Deleted(flag) => query_tasks(
                conn,
                "SELECT * FROM tasks WHERE is_deleted = ?1",
                &[flag],
            ),
            TaskFilter::Parent(None) => {
                query_tasks(conn, "SELECT * FROM tasks WHERE parent_id IS NULL", &[])
            }
            TaskFilter::Parent(Some(parent_id)) => query_tasks(
                conn,
                "SELECT * FROM tasks WHERE parent_id = ?1",
                &[parent_id],
            ),
            TaskFilter::Status(status) => query_tasks(
                conn,
                "SELECT * FROM tasks WHERE status = ?1",
                &[&status.as_str()],
            ),
        })
    }

    fn save(&self, node: &TaskNode) -> Result<()> {
        self.with_conn(|conn| upsert_internal(conn, node))
    }

    fn save_all(&self, nodes: &[TaskNode]) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            for node in nodes {
                upsert_internal(&tx, node)?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    fn delete_all_by_ids(&self, ids: &[String]) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut removed = 0;
            {
                let mut stmt = tx.prepare("DELETE FROM tasks WHERE id = ?1")?;
                for id in ids {
                    removed += stmt.execute(params![id])?;
                }
            }
            tx.commit()?;
            Ok(removed)
        })
    }

    fn list_tree(&self) -> Result<Vec<TaskNode>> {
        self.with_conn(|conn| {
            query_tasks(
                conn,
                "SELECT * FROM tasks WHERE is_deleted = 0 ORDER BY sort_order ASC, id ASC",
                &[],
            )
        })
    }

    fn list_deleted(&self) -> Result<Vec<TaskNode>> {
        self.with_conn(|conn| {
            query_tasks(
                conn,
                "SELECT * FROM tasks WHERE is_deleted = 1 ORDER BY deleted_at DESC",
                &[],
            )
        })
    }
}
