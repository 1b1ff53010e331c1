use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::api::ProjectApi;
use crate::bus::event_types::{PROJECT_CREATED, PROJECT_DELETED, PROJECT_UPDATED};
use crate::core::{dedup_by_id, dedup_by_key, sort_newest_first};
use crate::model::{ids, NewProject, Project, ProjectPatch};
use crate::sync::{SyncPayload, SyncService, SyncSubscription};

use super::StoreError;

struct ProjectState {
    projects: Vec<Project>,
    cache: HashMap<String, Project>,
    last_error: Option<String>,
    revision: u64,
}

impl ProjectState {
    fn new() -> Self {
        Self {
            projects: Vec::new(),
            cache: HashMap::new(),
            last_error: None,
            revision: 0,
        }
    }

    fn bump(&mut self) {
        self.revision += 1;
    }

    fn rebuild_cache(&mut self) {
        self.cache = self
            .projects
            .iter()
            .map(|project| (project.id.clone(), project.clone()))
            .collect();
    }

    fn merge(&mut self, project: Project) {
        self.projects.push(project);
        self.projects = dedup_by_key(&dedup_by_id(&self.projects), Project::secondary_key);
        sort_newest_first(&mut self.projects);
        self.rebuild_cache();
        self.bump();
    }

    fn remove(&mut self, id: &str) {
        let before = self.projects.len();
        self.projects.retain(|project| project.id != id);
        if self.projects.len() != before {
            self.cache.remove(id);
            self.bump();
        }
    }

    fn snapshot(&self) -> (Vec<Project>, HashMap<String, Project>) {
        (self.projects.clone(), self.cache.clone())
    }

    fn restore(&mut self, snapshot: (Vec<Project>, HashMap<String, Project>)) {
        self.projects = snapshot.0;
        self.cache = snapshot.1;
        self.bump();
    }
}

/// Optimistic project list. Projects are top-level, so there is no scope
/// predicate; the secondary key is the project name alone.
pub struct ProjectStore {
    api: Arc<dyn ProjectApi>,
    sync: Arc<SyncService>,
    state: Mutex<ProjectState>,
    subscriptions: Mutex<Vec<SyncSubscription>>,
}

impl ProjectStore {
    pub fn new(api: Arc<dyn ProjectApi>, sync: Arc<SyncService>) -> Arc<Self> {
        let store = Arc::new(Self {
            api,
            sync,
            state: Mutex::new(ProjectState::new()),
            subscriptions: Mutex::new(Vec::new()),
        });
        store.connect();
        store
    }

    pub async fn load(&self) -> Result<(), StoreError> {
        let fetched = self.api.list().await?;
        let mut state = self.lock_state();
        state.projects = dedup_by_key(&dedup_by_id(&fetched), Project::secondary_key);
        sort_newest_first(&mut state.projects);
        state.rebuild_cache();
        state.last_error = None;
        state.bump();
        Ok(())
    }

    pub async fn refresh(&self) {
        if let Err(e) = self.load().await {
            tracing::warn!(error = %e, "project refresh failed; keeping current list");
            self.lock_state().last_error = Some(e.to_string());
        }
    }

    pub async fn add_project(&self, draft: NewProject) -> Result<Project, StoreError> {
        let now = Utc::now().to_rfc3339();
        let provisional = Project {
            id: ids::temp_id(),
            name: draft.name.clone(),
            description: draft.description.clone(),
            created_at: now.clone(),
            updated_at: now,
            provisional: true,
        };
        let temp_id = provisional.id.clone();
        {
            let mut state = self.lock_state();
            state.projects.push(provisional.clone());
            sort_newest_first(&mut state.projects);
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
                self.sync.emit_project_created(&created);
                Ok(created)
            }
            Err(e) => {
                {
                    let mut state = self.lock_state();
                    state.remove(&temp_id);
                    state.last_error = Some(e.to_string());
                }
                tracing::warn!(error = %e, "project create failed; rolled back optimistic record");
                self.refresh().await;
                Err(e.into())
            }
        }
    }

    pub async fn update_project(
        &self,
        id: &str,
        patch: ProjectPatch,
    ) -> Result<Option<Project>, StoreError> {
        let snapshot = {
            let mut state = self.lock_state();
            let Some(current) = state.cache.get(id).cloned() else {
                tracing::warn!(project_id = id, "update requested for unknown project; ignoring");
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
                self.sync.emit_project_updated(&confirmed);
                Ok(Some(confirmed))
            }
            Err(e) => {
                {
                    let mut state = self.lock_state();
                    state.restore(snapshot);
                    state.last_error = Some(e.to_string());
                }
                tracing::warn!(project_id = id, error = %e, "project update failed; rolled back");
                self.refresh().await;
                Err(e.into())
            }
        }
    }

    pub async fn delete_project(&self, id: &str) -> Result<(), StoreError> {
        let (snapshot, removed) = {
            let mut state = self.lock_state();
            let Some(existing) = state.cache.get(id).cloned() else {
                tracing::warn!(project_id = id, "delete requested for unknown project; ignoring");
                return Ok(());
            };
            let snapshot = state.snapshot();
            state.remove(id);
            (snapshot, existing)
        };

        match self.api.delete(id).await {
            Ok(()) => {
                self.lock_state().last_error = None;
                self.sync.emit_project_deleted(&removed);
                Ok(())
            }
            Err(e) => {
                {
                    let mut state = self.lock_state();
                    state.restore(snapshot);
                    state.last_error = Some(e.to_string());
                }
                tracing::warn!(project_id = id, error = %e, "project delete failed; rolled back");
                self.refresh().await;
                Err(e.into())
            }
        }
    }

    pub fn projects(&self) -> Vec<Project> {
        self.lock_state().projects.clone()
    }

    pub fn get(&self, id: &str) -> Option<Project> {
        self.lock_state().cache.get(id).cloned()
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock_state().last_error.clone()
    }

    fn connect(self: &Arc<Self>) {
        let mut subscriptions = self.lock_subscriptions();
        let weak = Arc::downgrade(self);

        for event_type in [PROJECT_CREATED, PROJECT_UPDATED] {
            let weak = weak.clone();
            subscriptions.push(self.sync.subscribe(
                event_type,
                Arc::new(move |event| {
                    if let (Some(store), SyncPayload::Project(project)) =
                        (weak.upgrade(), &event.payload)
                    {
                        store.lock_state().merge(project.clone());
                    }
                }),
            ));
        }

        subscriptions.push(self.sync.subscribe(
            PROJECT_DELETED,
            Arc::new(move |event| {
                if let (Some(store), SyncPayload::Project(project)) =
                    (weak.upgrade(), &event.payload)
                {
                    store.lock_state().remove(&project.id);
                }
            }),
        ));
    }

    pub fn disconnect(&self) {
        for subscription in self.lock_subscriptions().drain(..) {
            subscription.unsubscribe();
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ProjectState> {
        self.state.lock().expect("project state poisoned")
    }

    fn lock_subscriptions(&self) -> std::sync::MutexGuard<'_, Vec<SyncSubscription>> {
        self.subscriptions.lock().expect("subscription list poisoned")
    }
}
