//! Integration tests for the task tree service over SQLite.
//!
//! These tests drive `TaskTreeService` against an in-memory database.
//! Tests are organized by operation.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::sync::Arc;
use task_tree::clock::FixedClock;
use task_tree::codec::TaskNodeDto;
use task_tree::db::Database;
use task_tree::error::ErrorCode;
use task_tree::store::TaskStore;
use task_tree::tree::TaskTreeService;

fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 2)
        .unwrap()
        .and_hms_opt(8, 30, 0)
        .unwrap()
}

/// Helper to create a service over a fresh in-memory database.
fn setup() -> (TaskTreeService<Database>, Arc<FixedClock>) {
    let db = Database::open_in_memory().expect("Failed to create in-memory database");
    let clock = Arc::new(FixedClock::new(t0()));
    (TaskTreeService::new(db, clock.clone()), clock)
}

fn node(id: &str, parent: Option<&str>, order: i32) -> TaskNodeDto {
    TaskNodeDto {
        id: Some(id.into()),
        node_type: Some("task".into()),
        title: Some(format!("Task {}", id)),
        parent_id: parent.map(String::from),
        order: Some(order),
        status: Some("TODO".into()),
        ..Default::default()
    }
}

/// A → B → C, plus an unrelated root D.
fn seed_chain(service: &TaskTreeService<Database>) {
    service
        .sync_tree(vec![
            node("A", None, 0),
            node("B", Some("A"), 0),
            node("C", Some("B"), 0),
            node("D", None, 1),
        ])
        .expect("seed");
}

fn ids(nodes: &[TaskNodeDto]) -> Vec<&str> {
    nodes.iter().filter_map(|n| n.id.as_deref()).collect()
}

mod create_tests {
    use super::*;

    #[test]
    fn create_generates_id_and_defaults() {
        let (service, _) = setup();

        let created = service
            .create(TaskNodeDto {
                title: Some("Write report".into()),
                ..Default::default()
            })
            .unwrap();

        let id = created.id.clone().unwrap();
        assert!(!id.is_empty());
        assert_eq!(created.node_type.as_deref(), Some("task"));
        assert_eq!(created.status.as_deref(), Some("TODO"));
        assert_eq!(created.order, Some(0));
        assert_eq!(created.is_deleted, Some(false));
        assert_eq!(created.created_at.as_deref(), Some("2026-03-02T08:30:00"));

        let stored = service.store().get(&id).unwrap().unwrap();
        assert_eq!(stored.title, "Write report");
    }

    #[test]
    fn create_rejects_blank_title() {
        let (service, _) = setup();

        let err = service
            .create(TaskNodeDto {
                title: Some("   ".into()),
                ..Default::default()
            })
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::InvalidArgument);
        assert_eq!(err.field.as_deref(), Some("title"));
        assert!(service.list_tree().unwrap().is_empty());
    }

    #[test]
    fn create_with_existing_id_replaces_stored_node() {
        let (service, _) = setup();
        seed_chain(&service);

        let mut replacement = node("B", None, 9);
        replacement.title = Some("Replaced".into());
        service.create(replacement).unwrap();

        let stored = service.store().get("B").unwrap().unwrap();
        assert_eq!(stored.title, "Replaced");
        assert_eq!(stored.parent_id, None);
        assert_eq!(stored.order, 9);
        assert_eq!(service.list_tree().unwrap().len(), 4);
    }

    #[test]
    fn create_rejects_bad_date() {
        let (service, _) = setup();
        let mut dto = node("X", None, 0);
        dto.scheduled_at = Some("next tuesday".into());

        let err = service.create(dto).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);
    }
}

mod update_tests {
    use super::*;

    #[test]
    fn done_stamps_completed_at_and_todo_clears_it() {
        let (service, clock) = setup();
        seed_chain(&service);

        clock.advance(Duration::minutes(5));
        let done = service
            .update(
                "C",
                TaskNodeDto {
                    status: Some("DONE".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(done.completed_at.as_deref(), Some("2026-03-02T08:35:00"));

        let reopened = service
            .update(
                "C",
                TaskNodeDto {
                    status: Some("TODO".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(reopened.completed_at, None);
    }

    #[test]
    fn empty_parent_moves_node_to_root() {
        let (service, _) = setup();
        seed_chain(&service);

        let moved = service
            .update(
                "B",
                TaskNodeDto {
                    parent_id: Some(String::new()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(moved.parent_id, None);
        assert_eq!(moved.title.as_deref(), Some("Task B"));
    }

    #[test]
    fn update_unknown_is_not_found() {
        let (service, _) = setup();
        let err = service.update("nope", TaskNodeDto::default()).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[test]
    fn update_unknown_with_malformed_status_is_not_found() {
        let (service, _) = setup();
        let err = service
            .update(
                "missing-id",
                TaskNodeDto {
                    status: Some("BOGUS".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}

mod cascade_tests {
    use super::*;

    #[test]
    fn soft_delete_hides_whole_subtree_with_one_timestamp() {
        let (service, _) = setup();
        seed_chain(&service);

        service.soft_delete("A").unwrap();

        assert_eq!(ids(&service.list_tree().unwrap()), vec!["D"]);
        let deleted = service.list_deleted().unwrap();
        assert_eq!(deleted.len(), 3);
        assert!(
            deleted
                .iter()
                .all(|n| n.deleted_at.as_deref() == Some("2026-03-02T08:30:00"))
        );
    }

    #[test]
    fn soft_delete_unknown_is_not_found() {
        let (service, _) = setup();
        let err = service.soft_delete("missing").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn restoring_a_leaf_revives_deleted_ancestors() {
        let (service, _) = setup();
        seed_chain(&service);
        service.soft_delete("A").unwrap();

        service.restore("C").unwrap();

        let mut visible = ids(&service.list_tree().unwrap())
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        visible.sort();
        assert_eq!(visible, vec!["A", "B", "C", "D"]);
        assert!(service.list_deleted().unwrap().is_empty());
    }

    #[test]
    fn restore_leaves_separately_deleted_sibling_alone() {
        let (service, clock) = setup();
        seed_chain(&service);
        service.sync_tree(vec![node("E", Some("A"), 1)]).unwrap();

        service.soft_delete("E").unwrap();
        clock.advance(Duration::hours(1));
        service.soft_delete("A").unwrap();

        service.restore("B").unwrap();

        let deleted = service.list_deleted().unwrap();
        // Deleting A re-stamped E along with the rest of the subtree.
        assert_eq!(ids(&deleted), vec!["E"]);
        assert_eq!(deleted[0].deleted_at.as_deref(), Some("2026-03-02T09:30:00"));
    }

    #[test]
    fn restore_and_purge_of_unknown_ids_are_silent() {
        let (service, _) = setup();
        seed_chain(&service);

        service.restore("ghost").unwrap();
        service.permanent_delete("ghost").unwrap();

        assert_eq!(service.list_tree().unwrap().len(), 4);
    }

    #[test]
    fn permanent_delete_removes_subtree_only() {
        let (service, _) = setup();
        seed_chain(&service);

        service.permanent_delete("B").unwrap();

        assert_eq!(ids(&service.list_tree().unwrap()), vec!["A", "D"]);
        assert!(service.store().get("C").unwrap().is_none());
    }

    #[test]
    fn cycles_do_not_hang_cascades() {
        let (service, _) = setup();
        service
            .sync_tree(vec![node("P", Some("Q"), 0), node("Q", Some("P"), 1)])
            .unwrap();

        service.soft_delete("P").unwrap();
        assert_eq!(service.list_deleted().unwrap().len(), 2);

        service.restore("Q").unwrap();
        assert_eq!(service.list_tree().unwrap().len(), 2);
    }
}

mod sync_tests {
    use super::*;

    #[test]
    fn list_tree_orders_by_order_field() {
        let (service, _) = setup();
        service
            .sync_tree(vec![node("late", None, 5), node("early", None, -1), node("mid", None, 2)])
            .unwrap();

        assert_eq!(ids(&service.list_tree().unwrap()), vec!["early", "mid", "late"]);
    }

    #[test]
    fn sync_round_trips_all_fields() {
        let (service, _) = setup();
        let mut dto = node("F", None, 3);
        dto.node_type = Some("folder".into());
        dto.is_expanded = Some(true);
        dto.content = Some("notes".into());
        dto.work_duration_minutes = Some(25);
        dto.scheduled_at = Some("2026-03-05T09:00:00".into());
        dto.color = Some("#ff8800".into());

        service.sync_tree(vec![dto]).unwrap();

        let listed = service.list_tree().unwrap();
        let got = &listed[0];
        assert_eq!(got.node_type.as_deref(), Some("folder"));
        assert_eq!(got.is_expanded, Some(true));
        assert_eq!(got.content.as_deref(), Some("notes"));
        assert_eq!(got.work_duration_minutes, Some(25));
        assert_eq!(got.scheduled_at.as_deref(), Some("2026-03-05T09:00:00"));
        assert_eq!(got.color.as_deref(), Some("#ff8800"));
    }

    #[test]
    fn bad_element_rejects_whole_batch() {
        let (service, _) = setup();
        let mut bad = node("Z", None, 0);
        bad.title = None;

        let err = service.sync_tree(vec![node("Y", None, 0), bad]).unwrap_err();

        assert_eq!(err.code, ErrorCode::InvalidArgument);
        assert!(service.list_tree().unwrap().is_empty());
    }
}

mod persistence_tests {
    use super::*;

    #[test]
    fn nodes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tasks.db");

        {
            let db = Database::open(&path).unwrap();
            let service = TaskTreeService::new(db, Arc::new(FixedClock::new(t0())));
            seed_chain(&service);
            service.soft_delete("B").unwrap();
        }

        let db = Database::open(&path).unwrap();
        let service = TaskTreeService::new(db, Arc::new(FixedClock::new(t0())));
        assert_eq!(ids(&service.list_tree().unwrap()), vec!["A", "D"]);
        assert_eq!(service.list_deleted().unwrap().len(), 2);
    }
}
