//! Domain sync layer over the event bus.
//!
//! One `SyncService` instance is shared by every store in the process, so a
//! confirmed mutation in any store reaches all the others. The service is
//! explicitly constructed and injected rather than a module-level global,
//! so tests get an isolated bus per case.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::bus::event_types::{
    INITIATIVE_CREATED, INITIATIVE_DELETED, INITIATIVE_UPDATED, PROJECT_CREATED, PROJECT_DELETED,
    PROJECT_UPDATED, TASK_CREATED, TASK_DELETED, TASK_UPDATED,
};
use crate::bus::{BusEvent, EventBus, Listener, Subscription};
use crate::model::{Initiative, Project, Task};

/// Hook point for an external cache/query layer. After each confirmed
/// mutation the service passes the affected query key parts, e.g.
/// `["tasks", "core"]` for a task in project `core`. The sync core works
/// with no invalidator attached.
pub trait QueryInvalidator: Send + Sync {
    fn invalidate(&self, key_parts: &[&str]);
}

/// Payload carried by every sync event. Deleted events carry the last-known
/// record so consumers can remove by id without a lookup round trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SyncPayload {
    Task(Task),
    Initiative(Initiative),
    Project(Project),
}

pub type SyncEvent = BusEvent<SyncPayload>;
pub type SyncListener = Listener<SyncPayload>;
pub type SyncSubscription = Subscription<SyncPayload>;

/// Process-wide sync fan-out: typed emit helpers over a shared bus plus the
/// optional query-invalidation bridge.
pub struct SyncService {
    bus: Arc<EventBus<SyncPayload>>,
    invalidator: Mutex<Option<Arc<dyn QueryInvalidator>>>,
}

impl SyncService {
    pub fn new() -> Self {
        Self::with_bus(Arc::new(EventBus::new()))
    }

    pub fn with_bus(bus: Arc<EventBus<SyncPayload>>) -> Self {
        Self {
            bus,
            invalidator: Mutex::new(None),
        }
    }

    pub fn bus(&self) -> &Arc<EventBus<SyncPayload>> {
        &self.bus
    }

    /// Attach the external cache/query layer. Optional; emits work the same
    /// with nothing attached.
    pub fn set_invalidator(&self, invalidator: Arc<dyn QueryInvalidator>) {
        *self
            .invalidator
            .lock()
            .expect("invalidator slot poisoned") = Some(invalidator);
    }

    pub fn subscribe(&self, event_type: &str, listener: SyncListener) -> SyncSubscription {
        self.bus.subscribe(event_type, listener)
    }

    // -----------------------------------------------------------------------
    // Typed emit helpers
    // -----------------------------------------------------------------------

    pub fn emit_task_created(&self, task: &Task) {
        self.emit(TASK_CREATED, SyncPayload::Task(task.clone()), &["tasks", &task.project]);
    }

    pub fn emit_task_updated(&self, task: &Task) {
        self.emit(TASK_UPDATED, SyncPayload::Task(task.clone()), &["tasks", &task.project]);
    }

    pub fn emit_task_deleted(&self, task: &Task) {
        self.emit(TASK_DELETED, SyncPayload::Task(task.clone()), &["tasks", &task.project]);
    }

    pub fn emit_initiative_created(&self, initiative: &Initiative) {
        self.emit(
            INITIATIVE_CREATED,
            SyncPayload::Initiative(initiative.clone()),
            &["initiatives", &initiative.project],
        );
    }

    pub fn emit_initiative_updated(&self, initiative: &Initiative) {
        self.emit(
            INITIATIVE_UPDATED,
            SyncPayload::Initiative(initiative.clone()),
            &["initiatives", &initiative.project],
        );
    }

    pub fn emit_initiative_deleted(&self, initiative: &Initiative) {
        self.emit(
            INITIATIVE_DELETED,
            SyncPayload::Initiative(initiative.clone()),
            &["initiatives", &initiative.project],
        );
    }

    pub fn emit_project_created(&self, project: &Project) {
        self.emit(PROJECT_CREATED, SyncPayload::Project(project.clone()), &["projects"]);
    }

    pub fn emit_project_updated(&self, project: &Project) {
        self.emit(PROJECT_UPDATED, SyncPayload::Project(project.clone()), &["projects"]);
    }

    pub fn emit_project_deleted(&self, project: &Project) {
        self.emit(PROJECT_DELETED, SyncPayload::Project(project.clone()), &["projects"]);
    }

    fn emit(&self, event_type: &str, payload: SyncPayload, cache_keys: &[&str]) {
        self.bus.emit(event_type, payload);
        let invalidator = self
            .invalidator
            .lock()
            .expect("invalidator slot poisoned")
            .clone();
        if let Some(invalidator) = invalidator {
            invalidator.invalidate(cache_keys);
        }
    }
}

impl Default for SyncService {
    fn default() -> Self {
        Self::new()
    }
}
