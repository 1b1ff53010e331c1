//! Two-session sync simulation.
//!
//! Wires two task stores to one sync bus with an in-memory API, the way two
//! mounted views (or two tabs bridged onto a shared bus) would be, then
//! narrates convergence: optimistic create, confirm-swap, status change,
//! failed create with rollback, delete.
//!
//! Run with: cargo run --bin sync_sim

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use taskpulse::api::{ApiError, TaskApi, TaskQuery};
use taskpulse::model::{NewTask, Priority, Task, TaskPatch, TaskStatus};
use taskpulse::{SyncService, TaskStore};

/// In-memory stand-in for the remote API, with a failure switch to
/// demonstrate rollback.
#[derive(Default)]
struct InMemoryTaskApi {
    tasks: Mutex<Vec<Task>>,
    reject_writes: AtomicBool,
}

impl InMemoryTaskApi {
    fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), ApiError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 503,
                message: "simulated outage".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TaskApi for InMemoryTaskApi {
    async fn list(&self, query: &TaskQuery) -> Result<Vec<Task>, ApiError> {
        Ok(self
            .tasks
            .lock()
            .expect("task list poisoned")
            .iter()
            .filter(|task| {
                query
                    .project
                    .as_ref()
                    .map_or(true, |project| &task.project == project)
            })
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Task>, ApiError> {
        Ok(self
            .tasks
            .lock()
            .expect("task list poisoned")
            .iter()
            .find(|task| task.id == id)
            .cloned())
    }

    async fn create(&self, draft: &NewTask) -> Result<Task, ApiError> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let created = Task {
            id: Uuid::new_v4().to_string(),
            title: draft.title.clone(),
            project: draft.project.clone(),
            status: draft.status.unwrap_or_default(),
            priority: draft.priority,
            notes: draft.notes.clone(),
            created_at: now.clone(),
            updated_at: now,
            provisional: false,
        };
        self.tasks
            .lock()
            .expect("task list poisoned")
            .push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: &str, patch: &TaskPatch) -> Result<Task, ApiError> {
        self.check_writable()?;
        let mut tasks = self.tasks.lock().expect("task list poisoned");
        let Some(task) = tasks.iter_mut().find(|task| task.id == id) else {
            return Err(ApiError::Status {
                status: 404,
                message: format!("task not found: {id}"),
            });
        };
        patch.apply_to(task);
        task.updated_at = Utc::now().to_rfc3339();
        Ok(task.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.check_writable()?;
        self.tasks
            .lock()
            .expect("task list poisoned")
            .retain(|task| task.id != id);
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskpulse=debug,info".parse().expect("valid env filter")),
        )
        .init();

    let api = Arc::new(InMemoryTaskApi::default());
    let sync = Arc::new(SyncService::new());
    sync.bus().start_leak_monitor(Duration::from_secs(30));

    let tab_a = TaskStore::new(api.clone(), sync.clone());
    let tab_b = TaskStore::new(api.clone(), sync.clone());
    tracing::info!("two task stores mounted on one sync bus");

    let created = tab_a
        .add_task(NewTask {
            title: "Write launch notes".to_string(),
            project: "core".to_string(),
            priority: Priority::High,
            status: Some(TaskStatus::Todo),
            notes: None,
        })
        .await
        .expect("create should succeed against in-memory api");
    tracing::info!(
        task_id = %created.id,
        tab_a = tab_a.len(),
        tab_b = tab_b.len(),
        "create confirmed in tab A, ingested by tab B"
    );

    tab_a
        .set_status(&created.id, TaskStatus::InProgress)
        .await
        .expect("status change should succeed");
    tracing::info!(
        tab_b_status = ?tab_b.get(&created.id).map(|task| task.status),
        "status change propagated"
    );

    // Simulated outage: the optimistic record must roll back in A and never
    // appear in B.
    api.set_reject_writes(true);
    let failed = tab_a
        .add_task(NewTask {
            title: "Doomed".to_string(),
            project: "core".to_string(),
            priority: Priority::Low,
            status: None,
            notes: None,
        })
        .await;
    api.set_reject_writes(false);
    tracing::info!(
        failed = failed.is_err(),
        tab_a = tab_a.len(),
        tab_b = tab_b.len(),
        last_error = ?tab_a.last_error(),
        "failed create rolled back"
    );

    tab_a
        .delete_task(&created.id)
        .await
        .expect("delete should succeed");
    tracing::info!(tab_a = tab_a.len(), tab_b = tab_b.len(), "delete propagated");

    let stale = sync.bus().identify_stale_listeners(10);
    tracing::info!(stale_candidates = stale.len(), "leak scan before shutdown");

    tab_a.disconnect();
    tab_b.disconnect();
    sync.bus().dispose();
    tracing::info!("buses disposed, simulation complete");
}
