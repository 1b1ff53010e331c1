//! Shared mock collaborators for unit tests.
//!
//! The API mocks keep a "server-side" list behind a mutex so tests can
//! assert what the remote would hold after reconciliation. `hold_creates`
//! parks the create call on a `Notify` gate, which is how the optimistic
//! tests observe state while the network call is still in flight.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::api::{
    ApiError, InitiativeApi, InitiativeQuery, ProjectApi, TaskApi, TaskQuery,
};
use crate::model::{
    Initiative, InitiativePatch, NewInitiative, NewProject, NewTask, Priority, Project,
    ProjectPatch, Task, TaskPatch, TaskStatus,
};
use crate::sync::QueryInvalidator;

pub fn task(id: &str, title: &str, project: &str) -> Task {
    let now = Utc::now().to_rfc3339();
    Task {
        id: id.to_string(),
        title: title.to_string(),
        project: project.to_string(),
        status: TaskStatus::Todo,
        priority: Priority::Medium,
        notes: None,
        created_at: now.clone(),
        updated_at: now,
        provisional: false,
    }
}

pub fn initiative(id: &str, name: &str, project: &str) -> Initiative {
    let now = Utc::now().to_rfc3339();
    Initiative {
        id: id.to_string(),
        name: name.to_string(),
        project: project.to_string(),
        status: crate::model::InitiativeStatus::Active,
        description: None,
        created_at: now.clone(),
        updated_at: now,
        provisional: false,
    }
}

pub fn project(id: &str, name: &str) -> Project {
    let now = Utc::now().to_rfc3339();
    Project {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        created_at: now.clone(),
        updated_at: now,
        provisional: false,
    }
}

fn rejected(op: &str) -> ApiError {
    ApiError::Status {
        status: 500,
        message: format!("{op} rejected by mock"),
    }
}

// ---------------------------------------------------------------------------
// Task API mock
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockTaskApi {
    remote: Mutex<Vec<Task>>,
    /// Queued responses for `create`, served before synthesizing one from
    /// the draft.
    create_responses: Mutex<VecDeque<Task>>,
    create_gate: Mutex<Option<Arc<Notify>>>,
    fail_create: AtomicBool,
    fail_update: AtomicBool,
    fail_delete: AtomicBool,
    fail_list: AtomicBool,
}

impl MockTaskApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seeded(tasks: Vec<Task>) -> Arc<Self> {
        let api = Self::new();
        *api.remote.lock().unwrap() = tasks;
        api
    }

    /// Park every `create` call until the returned gate is notified.
    pub fn hold_creates(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.create_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn push_create_response(&self, task: Task) {
        self.create_responses.lock().unwrap().push_back(task);
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_update(&self, fail: bool) {
        self.fail_update.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// What the "server" holds right now.
    pub fn remote_tasks(&self) -> Vec<Task> {
        self.remote.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskApi for MockTaskApi {
    async fn list(&self, query: &TaskQuery) -> Result<Vec<Task>, ApiError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(rejected("list"));
        }
        Ok(self
            .remote
            .lock()
            .unwrap()
            .iter()
            .filter(|task| {
                query
                    .project
                    .as_ref()
                    .map_or(true, |project| &task.project == project)
                    && query.status.map_or(true, |status| task.status == status)
            })
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Task>, ApiError> {
        Ok(self
            .remote
            .lock()
            .unwrap()
            .iter()
            .find(|task| task.id == id)
            .cloned())
    }

    async fn create(&self, draft: &NewTask) -> Result<Task, ApiError> {
        let gate = self.create_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(rejected("create"));
        }
        let queued = self.create_responses.lock().unwrap().pop_front();
        let created = queued.unwrap_or_else(|| {
            let now = Utc::now().to_rfc3339();
            Task {
                id: format!("srv-{}", Uuid::new_v4()),
                title: draft.title.clone(),
                project: draft.project.clone(),
                status: draft.status.unwrap_or_default(),
                priority: draft.priority,
                notes: draft.notes.clone(),
                created_at: now.clone(),
                updated_at: now,
                provisional: false,
            }
        });
        self.remote.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: &str, patch: &TaskPatch) -> Result<Task, ApiError> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(rejected("update"));
        }
        let mut remote = self.remote.lock().unwrap();
        let Some(task) = remote.iter_mut().find(|task| task.id == id) else {
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
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(rejected("delete"));
        }
        self.remote.lock().unwrap().retain(|task| task.id != id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Initiative API mock
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockInitiativeApi {
    remote: Mutex<Vec<Initiative>>,
    fail_create: AtomicBool,
}

impl MockInitiativeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seeded(initiatives: Vec<Initiative>) -> Arc<Self> {
        let api = Self::new();
        *api.remote.lock().unwrap() = initiatives;
        api
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl InitiativeApi for MockInitiativeApi {
    async fn list(&self, query: &InitiativeQuery) -> Result<Vec<Initiative>, ApiError> {
        Ok(self
            .remote
            .lock()
            .unwrap()
            .iter()
            .filter(|initiative| {
                query
                    .project
                    .as_ref()
                    .map_or(true, |project| &initiative.project == project)
            })
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Initiative>, ApiError> {
        Ok(self
            .remote
            .lock()
            .unwrap()
            .iter()
            .find(|initiative| initiative.id == id)
            .cloned())
    }

    async fn create(&self, draft: &NewInitiative) -> Result<Initiative, ApiError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(rejected("create"));
        }
        let now = Utc::now().to_rfc3339();
        let created = Initiative {
            id: format!("srv-{}", Uuid::new_v4()),
            name: draft.name.clone(),
            project: draft.project.clone(),
            status: draft.status.unwrap_or_default(),
            description: draft.description.clone(),
            created_at: now.clone(),
            updated_at: now,
            provisional: false,
        };
        self.remote.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: &str, patch: &InitiativePatch) -> Result<Initiative, ApiError> {
        let mut remote = self.remote.lock().unwrap();
        let Some(initiative) = remote.iter_mut().find(|initiative| initiative.id == id) else {
            return Err(ApiError::Status {
                status: 404,
                message: format!("initiative not found: {id}"),
            });
        };
        patch.apply_to(initiative);
        initiative.updated_at = Utc::now().to_rfc3339();
        Ok(initiative.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.remote
            .lock()
            .unwrap()
            .retain(|initiative| initiative.id != id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Project API mock
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockProjectApi {
    remote: Mutex<Vec<Project>>,
}

impl MockProjectApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl ProjectApi for MockProjectApi {
    async fn list(&self) -> Result<Vec<Project>, ApiError> {
        Ok(self.remote.lock().unwrap().clone())
    }

    async fn get(&self, id: &str) -> Result<Option<Project>, ApiError> {
        Ok(self
            .remote
            .lock()
            .unwrap()
            .iter()
            .find(|project| project.id == id)
            .cloned())
    }

    async fn create(&self, draft: &NewProject) -> Result<Project, ApiError> {
        let now = Utc::now().to_rfc3339();
        let created = Project {
            id: format!("srv-{}", Uuid::new_v4()),
            name: draft.name.clone(),
            description: draft.description.clone(),
            created_at: now.clone(),
            updated_at: now,
            provisional: false,
        };
        self.remote.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: &str, patch: &ProjectPatch) -> Result<Project, ApiError> {
        let mut remote = self.remote.lock().unwrap();
        let Some(project) = remote.iter_mut().find(|project| project.id == id) else {
            return Err(ApiError::Status {
                status: 404,
                message: format!("project not found: {id}"),
            });
        };
        patch.apply_to(project);
        project.updated_at = Utc::now().to_rfc3339();
        Ok(project.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.remote.lock().unwrap().retain(|project| project.id != id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Invalidator recorder
// ---------------------------------------------------------------------------

/// Records every invalidation call for assertion.
#[derive(Default)]
pub struct RecordingInvalidator {
    calls: Mutex<Vec<Vec<String>>>,
}

impl RecordingInvalidator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

impl QueryInvalidator for RecordingInvalidator {
    fn invalidate(&self, key_parts: &[&str]) {
        self.calls
            .lock()
            .unwrap()
            .push(key_parts.iter().map(|part| part.to_string()).collect());
    }
}
