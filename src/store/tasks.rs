use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::api::{TaskApi, TaskQuery};
use crate::bus::event_types::{TASK_CREATED, TASK_DELETED, TASK_UPDATED};
use crate::core::{dedup_by_id, dedup_by_key, sort_tasks, SortConfig};
use crate::model::{ids, NewTask, Task, TaskPatch, TaskStatus};
use crate::prefs::PreferenceStore;
use crate::sync::{SyncPayload, SyncService, SyncSubscription};

use super::StoreError;

const SORT_PREF_KEY: &str = "tasks.sort";

/// View-level filter over the full task list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub project: Option<String>,
    pub search: String,
}

#[derive(Default)]
pub struct TaskStoreOptions {
    /// Restrict real-time ingestion and refreshes to one project. Unscoped
    /// stores see everything.
    pub scope: Option<String>,
    /// Persist sort choices across sessions when attached.
    pub prefs: Option<Arc<dyn PreferenceStore>>,
}

struct TaskState {
    tasks: Vec<Task>,
    /// Last-known-good (or optimistic) record per id, for delta operations
    /// that read pre-transition state. Rebuilt whenever the list changes.
    cache: HashMap<String, Task>,
    filter: TaskFilter,
    sort: SortConfig,
    last_error: Option<String>,
    /// Bumped on every list or filter change; memoized views are keyed on it.
    revision: u64,
    filtered: Option<(u64, Vec<Task>)>,
    counts: Option<(u64, HashMap<TaskStatus, usize>)>,
}

impl TaskState {
    fn new(sort: SortConfig) -> Self {
        Self {
            tasks: Vec::new(),
            cache: HashMap::new(),
            filter: TaskFilter::default(),
            sort,
            last_error: None,
            revision: 0,
            filtered: None,
            counts: None,
        }
    }

    fn bump(&mut self) {
        self.revision += 1;
    }

    fn apply_order(&mut self) {
        sort_tasks(&mut self.tasks, self.sort.key, self.sort.direction);
    }

    fn rebuild_cache(&mut self) {
        self.cache = self
            .tasks
            .iter()
            .map(|task| (task.id.clone(), task.clone()))
            .collect();
    }

    /// Merge `task` into the list: dedup by id and secondary key, re-sort,
    /// rebuild the cache. The shared path for confirmations and remote
    /// ingestion, which is what makes self-notification idempotent.
    fn merge(&mut self, task: Task) {
        self.tasks.push(task);
        self.tasks = dedup_by_key(&dedup_by_id(&self.tasks), Task::secondary_key);
        self.apply_order();
        self.rebuild_cache();
        self.bump();
    }

    fn remove(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        let removed = self.tasks.len() != before;
        if removed {
            self.cache.remove(id);
            self.bump();
        }
        removed
    }

    fn snapshot(&self) -> (Vec<Task>, HashMap<String, Task>) {
        (self.tasks.clone(), self.cache.clone())
    }

    fn restore(&mut self, snapshot: (Vec<Task>, HashMap<String, Task>)) {
        self.tasks = snapshot.0;
        self.cache = snapshot.1;
        self.bump();
    }
}

/// Optimistic task list for one UI scope.
///
/// Construction subscribes to the task event triad; `disconnect` (or
/// dropping the store) detaches it. Mutation methods apply their optimistic
/// change before the first `await`, so the change is visible to views even
/// while the network call is still in flight.
pub struct TaskStore {
    api: Arc<dyn TaskApi>,
    sync: Arc<SyncService>,
    prefs: Option<Arc<dyn PreferenceStore>>,
    scope: Option<String>,
    state: Mutex<TaskState>,
    subscriptions: Mutex<Vec<SyncSubscription>>,
}

impl TaskStore {
    pub fn new(api: Arc<dyn TaskApi>, sync: Arc<SyncService>) -> Arc<Self> {
        Self::with_options(api, sync, TaskStoreOptions::default())
    }

    pub fn with_options(
        api: Arc<dyn TaskApi>,
        sync: Arc<SyncService>,
        options: TaskStoreOptions,
    ) -> Arc<Self> {
        let sort = options
            .prefs
            .as_ref()
            .and_then(|prefs| prefs.get(SORT_PREF_KEY))
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();

        let store = Arc::new(Self {
            api,
            sync,
            prefs: options.prefs,
            scope: options.scope,
            state: Mutex::new(TaskState::new(sort)),
            subscriptions: Mutex::new(Vec::new()),
        });
        store.connect();
        store
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Initial load from the authoritative source.
    pub async fn load(&self) -> Result<(), StoreError> {
        let query = TaskQuery {
            project: self.scope.clone(),
            status: None,
        };
        let fetched = self.api.list(&query).await?;
        let mut state = self.lock_state();
        state.tasks = dedup_by_key(&dedup_by_id(&fetched), Task::secondary_key);
        state.apply_order();
        state.rebuild_cache();
        state.last_error = None;
        state.bump();
        Ok(())
    }

    /// Best-effort re-fetch, used after failed mutations to converge back to
    /// server state. Keeps the current list when the fetch itself fails.
    pub async fn refresh(&self) {
        if let Err(e) = self.load().await {
            tracing::warn!(error = %e, "task refresh failed; keeping current list");
            self.lock_state().last_error = Some(e.to_string());
        }
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Create a task optimistically. The provisional record (temporary id,
    /// `provisional: true`) is in the list before this function first
    /// suspends; the confirmed record replaces it via re-sort when the
    /// server responds.
    pub async fn add_task(&self, draft: NewTask) -> Result<Task, StoreError> {
        let now = Utc::now().to_rfc3339();
        let provisional = Task {
            id: ids::temp_id(),
            title: draft.title.clone(),
            project: draft.project.clone(),
            status: draft.status.unwrap_or_default(),
            priority: draft.priority,
            notes: draft.notes.clone(),
            created_at: now.clone(),
            updated_at: now,
            provisional: true,
        };
        let temp_id = provisional.id.clone();
        {
            let mut state = self.lock_state();
            state.tasks.push(provisional.clone());
            state.apply_order();
            state.cache.insert(temp_id.clone(), provisional);
            state.bump();
        }

        match self.api.create(&draft).await {
            Ok(created) => {
                {
                    let mut state = self.lock_state();
                    state.remove(&temp_id);
                    state.merge(created.clone());
                    state.last_error = None;
                }
                self.sync.emit_task_created(&created);
                Ok(created)
            }
            Err(e) => {
                {
                    let mut state = self.lock_state();
                    state.remove(&temp_id);
                    state.last_error = Some(e.to_string());
                }
                tracing::warn!(error = %e, "task create failed; rolled back optimistic record");
                self.refresh().await;
                Err(e.into())
            }
        }
    }

    /// Patch a task optimistically. Unknown ids are logged no-ops (`None`):
    /// a late or duplicate command is safer ignored than applied blind.
    pub async fn update_task(&self, id: &str, patch: TaskPatch) -> Result<Option<Task>, StoreError> {
        let snapshot = {
            let mut state = self.lock_state();
            let Some(current) = state.cache.get(id).cloned() else {
                tracing::warn!(task_id = id, "update requested for unknown task; ignoring");
                return Ok(None);
            };
            let snapshot = state.snapshot();
            let mut merged = current;
            patch.apply_to(&mut merged);
            merged.updated_at = Utc::now().to_rfc3339();
            state.merge(merged);
            snapshot
        };

        match self.api.update(id, &patch).await {
            Ok(confirmed) => {
                {
                    let mut state = self.lock_state();
                    state.merge(confirmed.clone());
                    state.last_error = None;
                }
                self.sync.emit_task_updated(&confirmed);
                Ok(Some(confirmed))
            }
            Err(e) => {
                {
                    let mut state = self.lock_state();
                    state.restore(snapshot);
                    state.last_error = Some(e.to_string());
                }
                tracing::warn!(task_id = id, error = %e, "task update failed; rolled back");
                self.refresh().await;
                Err(e.into())
            }
        }
    }

    /// Status transition; reads the pre-transition record from the cache.
    pub async fn set_status(
        &self,
        id: &str,
        status: TaskStatus,
    ) -> Result<Option<Task>, StoreError> {
        self.update_task(id, TaskPatch::status(status)).await
    }

    pub async fn delete_task(&self, id: &str) -> Result<(), StoreError> {
        let (snapshot, removed) = {
            let mut state = self.lock_state();
            let Some(existing) = state.cache.get(id).cloned() else {
                tracing::warn!(task_id = id, "delete requested for unknown task; ignoring");
                return Ok(());
            };
            let snapshot = state.snapshot();
            state.remove(id);
            (snapshot, existing)
        };

        match self.api.delete(id).await {
            Ok(()) => {
                self.lock_state().last_error = None;
                self.sync.emit_task_deleted(&removed);
                Ok(())
            }
            Err(e) => {
                {
                    let mut state = self.lock_state();
                    state.restore(snapshot);
                    state.last_error = Some(e.to_string());
                }
                tracing::warn!(task_id = id, error = %e, "task delete failed; rolled back");
                self.refresh().await;
                Err(e.into())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    pub fn tasks(&self) -> Vec<Task> {
        self.lock_state().tasks.clone()
    }

    pub fn get(&self, id: &str) -> Option<Task> {
        self.lock_state().cache.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock_state().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_state().tasks.is_empty()
    }

    /// Tasks passing the current filter, memoized on the list revision.
    pub fn filtered_tasks(&self) -> Vec<Task> {
        let mut state = self.lock_state();
        if let Some((revision, cached)) = &state.filtered {
            if *revision == state.revision {
                return cached.clone();
            }
        }

        let needle = state.filter.search.to_lowercase();
        let computed: Vec<Task> = state
            .tasks
            .iter()
            .filter(|task| {
                state.filter.status.map_or(true, |status| task.status == status)
                    && state
                        .filter
                        .project
                        .as_ref()
                        .map_or(true, |project| &task.project == project)
                    && (needle.is_empty()
                        || task.title.to_lowercase().contains(&needle)
                        || task
                            .notes
                            .as_deref()
                            .is_some_and(|notes| notes.to_lowercase().contains(&needle)))
            })
            .cloned()
            .collect();
        state.filtered = Some((state.revision, computed.clone()));
        computed
    }

    /// Per-status tally over the unfiltered list. Every known status is
    /// present, zero-count statuses included.
    pub fn counts_by_status(&self) -> HashMap<TaskStatus, usize> {
        let mut state = self.lock_state();
        if let Some((revision, cached)) = &state.counts {
            if *revision == state.revision {
                return cached.clone();
            }
        }

        let mut counts: HashMap<TaskStatus, usize> = TaskStatus::PROGRESSION
            .iter()
            .map(|status| (*status, 0))
            .collect();
        for task in &state.tasks {
            *counts.entry(task.status).or_insert(0) += 1;
        }
        state.counts = Some((state.revision, counts.clone()));
        counts
    }

    pub fn filter(&self) -> TaskFilter {
        self.lock_state().filter.clone()
    }

    pub fn set_filter(&self, filter: TaskFilter) {
        let mut state = self.lock_state();
        if state.filter != filter {
            state.filter = filter;
            state.bump();
        }
    }

    pub fn sort(&self) -> SortConfig {
        self.lock_state().sort
    }

    pub fn set_sort(&self, sort: SortConfig) {
        {
            let mut state = self.lock_state();
            if state.sort == sort {
                return;
            }
            state.sort = sort;
            state.apply_order();
            state.bump();
        }
        if let Some(prefs) = &self.prefs {
            if let Ok(raw) = serde_json::to_string(&sort) {
                prefs.set(SORT_PREF_KEY, &raw);
            }
        }
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock_state().last_error.clone()
    }

    pub fn clear_error(&self) {
        self.lock_state().last_error = None;
    }

    // -----------------------------------------------------------------------
    // Real-time ingestion
    // -----------------------------------------------------------------------

    fn connect(self: &Arc<Self>) {
        let mut subscriptions = self.lock_subscriptions();
        let weak = Arc::downgrade(self);

        let on_created = {
            let weak = weak.clone();
            self.sync.subscribe(
                TASK_CREATED,
                Arc::new(move |event| {
                    if let (Some(store), SyncPayload::Task(task)) =
                        (weak.upgrade(), &event.payload)
                    {
                        store.ingest_upsert(task, true);
                    }
                }),
            )
        };
        subscriptions.push(on_created);

        let on_updated = {
            let weak = weak.clone();
            self.sync.subscribe(
                TASK_UPDATED,
                Arc::new(move |event| {
                    if let (Some(store), SyncPayload::Task(task)) =
                        (weak.upgrade(), &event.payload)
                    {
                        store.ingest_upsert(task, false);
                    }
                }),
            )
        };
        subscriptions.push(on_updated);

        let on_deleted = self.sync.subscribe(
            TASK_DELETED,
            Arc::new(move |event| {
                if let (Some(store), SyncPayload::Task(task)) = (weak.upgrade(), &event.payload) {
                    store.ingest_delete(&task.id);
                }
            }),
        );
        subscriptions.push(on_deleted);
    }

    /// Detach from the sync bus. In-flight mutations still settle; their
    /// confirmations merge directly rather than via events.
    pub fn disconnect(&self) {
        for subscription in self.lock_subscriptions().drain(..) {
            subscription.unsubscribe();
        }
    }

    /// Handler for created/updated events from any session, this store's own
    /// included. Never re-emits. Merging through the dedup path makes
    /// re-application of an already-applied change a no-op.
    fn ingest_upsert(&self, task: &Task, created: bool) {
        if !self.in_scope(task) {
            // An update can move a record out of this store's scope.
            if !created {
                self.ingest_delete(&task.id);
            }
            return;
        }
        self.lock_state().merge(task.clone());
    }

    fn ingest_delete(&self, id: &str) {
        self.lock_state().remove(id);
    }

    fn in_scope(&self, task: &Task) -> bool {
        self.scope
            .as_ref()
            .map_or(true, |project| &task.project == project)
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, TaskState> {
        self.state.lock().expect("task state poisoned")
    }

    fn lock_subscriptions(&self) -> std::sync::MutexGuard<'_, Vec<SyncSubscription>> {
        self.subscriptions.lock().expect("subscription list poisoned")
    }
}
