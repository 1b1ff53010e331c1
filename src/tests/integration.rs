//! Cross-store convergence tests.
//!
//! Two stores sharing one `SyncService` stand in for two mounted views (or
//! the same view in two browser tabs wired to a common bus): a confirmed
//! mutation in either must reach the other through events alone.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use crate::model::{InitiativeStatus, NewInitiative, NewTask, Priority, TaskPatch, TaskStatus};
use crate::store::{InitiativeStore, ProjectStore, TaskStore, TaskStoreOptions};
use crate::sync::SyncService;
use crate::testing::{MockInitiativeApi, MockProjectApi, MockTaskApi};

fn draft(title: &str, project: &str) -> NewTask {
    NewTask {
        title: title.to_string(),
        project: project.to_string(),
        priority: Priority::Medium,
        status: None,
        notes: None,
    }
}

#[tokio::test]
async fn test_create_in_one_store_reaches_the_other() {
    let sync = Arc::new(SyncService::new());
    let api = MockTaskApi::new();
    let left = TaskStore::new(api.clone(), sync.clone());
    let right = TaskStore::new(api, sync);

    let created = left.add_task(draft("Write spec", "core")).await.expect("create");

    assert_eq!(left.len(), 1);
    assert_eq!(right.len(), 1);
    assert_eq!(right.tasks()[0].id, created.id);
}

#[tokio::test]
async fn test_update_and_delete_propagate_across_stores() {
    let sync = Arc::new(SyncService::new());
    let api = MockTaskApi::new();
    let left = TaskStore::new(api.clone(), sync.clone());
    let right = TaskStore::new(api, sync);

    let created = left.add_task(draft("Write spec", "core")).await.expect("create");

    left.update_task(
        &created.id,
        TaskPatch {
            status: Some(TaskStatus::Done),
            ..TaskPatch::default()
        },
    )
    .await
    .expect("update");
    assert_eq!(right.tasks()[0].status, TaskStatus::Done);

    left.delete_task(&created.id).await.expect("delete");
    assert!(right.is_empty());
}

#[tokio::test]
async fn test_scoped_store_ignores_other_projects() {
    let sync = Arc::new(SyncService::new());
    let api = MockTaskApi::new();
    let unscoped = TaskStore::new(api.clone(), sync.clone());
    let scoped = TaskStore::with_options(
        api,
        sync,
        TaskStoreOptions {
            scope: Some("core".to_string()),
            prefs: None,
        },
    );

    unscoped.add_task(draft("In scope", "core")).await.expect("create");
    unscoped.add_task(draft("Elsewhere", "site")).await.expect("create");

    assert_eq!(unscoped.len(), 2);
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped.tasks()[0].title, "In scope");
}

#[tokio::test]
async fn test_update_moving_task_out_of_scope_removes_it() {
    let sync = Arc::new(SyncService::new());
    let api = MockTaskApi::new();
    let unscoped = TaskStore::new(api.clone(), sync.clone());
    let scoped = TaskStore::with_options(
        api,
        sync,
        TaskStoreOptions {
            scope: Some("core".to_string()),
            prefs: None,
        },
    );

    let created = unscoped.add_task(draft("Movable", "core")).await.expect("create");
    assert_eq!(scoped.len(), 1);

    unscoped
        .update_task(
            &created.id,
            TaskPatch {
                project: Some("site".to_string()),
                ..TaskPatch::default()
            },
        )
        .await
        .expect("update");

    assert_eq!(scoped.len(), 0);
    assert_eq!(unscoped.len(), 1);
}

#[tokio::test]
async fn test_task_events_do_not_touch_other_entity_stores() {
    let sync = Arc::new(SyncService::new());
    let tasks = TaskStore::new(MockTaskApi::new(), sync.clone());
    let projects = ProjectStore::new(MockProjectApi::new(), sync.clone());
    let initiatives = InitiativeStore::new(MockInitiativeApi::new(), sync);

    tasks.add_task(draft("Write spec", "core")).await.expect("create");

    assert_eq!(tasks.len(), 1);
    assert!(projects.projects().is_empty());
    assert!(initiatives.initiatives().is_empty());
}

#[tokio::test]
async fn test_initiative_lifecycle_converges_across_stores() {
    let sync = Arc::new(SyncService::new());
    let api = MockInitiativeApi::new();
    let left = InitiativeStore::new(api.clone(), sync.clone());
    let right = InitiativeStore::new(api, sync);

    let created = left
        .add_initiative(NewInitiative {
            name: "Realtime sync".to_string(),
            project: "core".to_string(),
            status: Some(InitiativeStatus::Active),
            description: None,
        })
        .await
        .expect("create");

    assert_eq!(right.initiatives().len(), 1);

    left.set_status(&created.id, InitiativeStatus::Completed)
        .await
        .expect("update");
    assert_eq!(right.initiatives()[0].status, InitiativeStatus::Completed);

    let counts = right.counts_by_status();
    assert_eq!(counts[&InitiativeStatus::Completed], 1);
    assert_eq!(counts[&InitiativeStatus::Proposed], 0);

    left.delete_initiative(&created.id).await.expect("delete");
    assert!(right.initiatives().is_empty());
}

#[tokio::test]
async fn test_rollback_in_one_store_leaves_others_untouched() {
    let sync = Arc::new(SyncService::new());
    let api = MockTaskApi::new();
    let left = TaskStore::new(api.clone(), sync.clone());
    let right = TaskStore::new(api.clone(), sync);

    api.set_fail_create(true);
    let result = left.add_task(draft("Doomed", "core")).await;

    assert!(result.is_err());
    // No event was emitted for the failed create, so neither side holds it.
    assert!(left.is_empty());
    assert!(right.is_empty());
    assert!(api.remote_tasks().is_empty());
}
