use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::api::{InitiativeApi, InitiativeQuery};
use crate::bus::event_types::{INITIATIVE_CREATED, INITIATIVE_DELETED, INITIATIVE_UPDATED};
use crate::core::{dedup_by_id, dedup_by_key, sort_newest_first};
use crate::model::{ids, Initiative, InitiativePatch, InitiativeStatus, NewInitiative};
use crate::sync::{SyncPayload, SyncService, SyncSubscription};

use super::StoreError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitiativeFilter {
    pub status: Option<InitiativeStatus>,
    pub search: String,
}

struct InitiativeState {
    initiatives: Vec<Initiative>,
    cache: HashMap<String, Initiative>,
    filter: InitiativeFilter,
    last_error: Option<String>,
    revision: u64,
    filtered: Option<(u64, Vec<Initiative>)>,
    counts: Option<(u64, HashMap<InitiativeStatus, usize>)>,
}

impl InitiativeState {
    fn new() -> Self {
        Self {
            initiatives: Vec::new(),
            cache: HashMap::new(),
            filter: InitiativeFilter::default(),
            last_error: None,
            revision: 0,
            filtered: None,
            counts: None,
        }
    }

    fn bump(&mut self) {
        self.revision += 1;
    }

    fn rebuild_cache(&mut self) {
        self.cache = self
            .initiatives
            .iter()
            .map(|initiative| (initiative.id.clone(), initiative.clone()))
            .collect();
    }

    fn merge(&mut self, initiative: Initiative) {
        self.initiatives.push(initiative);
        self.initiatives =
            dedup_by_key(&dedup_by_id(&self.initiatives), Initiative::secondary_key);
        sort_newest_first(&mut self.initiatives);
        self.rebuild_cache();
        self.bump();
    }

    fn remove(&mut self, id: &str) {
        let before = self.initiatives.len();
        self.initiatives.retain(|initiative| initiative.id != id);
        if self.initiatives.len() != before {
            self.cache.remove(id);
            self.bump();
        }
    }

    fn snapshot(&self) -> (Vec<Initiative>, HashMap<String, Initiative>) {
        (self.initiatives.clone(), self.cache.clone())
    }

    fn restore(&mut self, snapshot: (Vec<Initiative>, HashMap<String, Initiative>)) {
        self.initiatives = snapshot.0;
        self.cache = snapshot.1;
        self.bump();
    }
}

/// Optimistic initiative list; same reconciliation model as `TaskStore`,
/// always ordered newest-first.
pub struct InitiativeStore {
    api: Arc<dyn InitiativeApi>,
    sync: Arc<SyncService>,
    scope: Option<String>,
    state: Mutex<InitiativeState>,
    subscriptions: Mutex<Vec<SyncSubscription>>,
}

impl InitiativeStore {
    pub fn new(api: Arc<dyn InitiativeApi>, sync: Arc<SyncService>) -> Arc<Self> {
        Self::scoped(api, sync, None)
    }

    pub fn scoped(
        api: Arc<dyn InitiativeApi>,
        sync: Arc<SyncService>,
        scope: Option<String>,
    ) -> Arc<Self> {
        let store = Arc::new(Self {
            api,
            sync,
            scope,
            state: Mutex::new(InitiativeState::new()),
            subscriptions: Mutex::new(Vec::new()),
        });
        store.connect();
        store
    }

    pub async fn load(&self) -> Result<(), StoreError> {
        let query = InitiativeQuery {
            project: self.scope.clone(),
        };
        let fetched = self.api.list(&query).await?;
        let mut state = self.lock_state();
        state.initiatives = dedup_by_key(&dedup_by_id(&fetched), Initiative::secondary_key);
        sort_newest_first(&mut state.initiatives);
        state.rebuild_cache();
        state.last_error = None;
        state.bump();
        Ok(())
    }

    pub async fn refresh(&self) {
        if let Err(e) = self.load().await {
            tracing::warn!(error = %e, "initiative refresh failed; keeping current list");
            self.lock_state().last_error = Some(e.to_string());
        }
    }

    pub async fn add_initiative(&self, draft: NewInitiative) -> Result<Initiative, StoreError> {
        let now = Utc::now().to_rfc3339();
        let provisional = Initiative {
            id: ids::temp_id(),
            name: draft.name.clone(),
            project: draft.project.clone(),
            status: draft.status.unwrap_or_default(),
            description: draft.description.clone(),
            created_at: now.clone(),
            updated_at: now,
            provisional: true,
        };
        let temp_id = provisional.id.clone();
        {
            let mut state = self.lock_state();
            state.initiatives.push(provisional.clone());
            sort_newest_first(&mut state.initiatives);
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
                self.sync.emit_initiative_created(&created);
                Ok(created)
            }
            Err(e) => {
                {
                    let mut state = self.lock_state();
                    state.remove(&temp_id);
                    state.last_error = Some(e.to_string());
                }
                tracing::warn!(error = %e, "initiative create failed; rolled back optimistic record");
                self.refresh().await;
                Err(e.into())
            }
        }
    }

    pub async fn update_initiative(
        &self,
        id: &str,
        patch: InitiativePatch,
    ) -> Result<Option<Initiative>, StoreError> {
        let snapshot = {
            let mut state = self.lock_state();
            let Some(current) = state.cache.get(id).cloned() else {
                tracing::warn!(initiative_id = id, "update requested for unknown initiative; ignoring");
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
                self.sync.emit_initiative_updated(&confirmed);
                Ok(Some(confirmed))
            }
            Err(e) => {
                {
                    let mut state = self.lock_state();
                    state.restore(snapshot);
                    state.last_error = Some(e.to_string());
                }
                tracing::warn!(initiative_id = id, error = %e, "initiative update failed; rolled back");
                self.refresh().await;
                Err(e.into())
            }
        }
    }

    pub async fn set_status(
        &self,
        id: &str,
        status: InitiativeStatus,
    ) -> Result<Option<Initiative>, StoreError> {
        self.update_initiative(id, InitiativePatch::status(status)).await
    }

    pub async fn delete_initiative(&self, id: &str) -> Result<(), StoreError> {
        let (snapshot, removed) = {
            let mut state = self.lock_state();
            let Some(existing) = state.cache.get(id).cloned() else {
                tracing::warn!(initiative_id = id, "delete requested for unknown initiative; ignoring");
                return Ok(());
            };
            let snapshot = state.snapshot();
            state.remove(id);
            (snapshot, existing)
        };

        match self.api.delete(id).await {
            Ok(()) => {
                self.lock_state().last_error = None;
                self.sync.emit_initiative_deleted(&removed);
                Ok(())
            }
            Err(e) => {
                {
                    let mut state = self.lock_state();
                    state.restore(snapshot);
                    state.last_error = Some(e.to_string());
                }
                tracing::warn!(initiative_id = id, error = %e, "initiative delete failed; rolled back");
                self.refresh().await;
                Err(e.into())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    pub fn initiatives(&self) -> Vec<Initiative> {
        self.lock_state().initiatives.clone()
    }

    pub fn get(&self, id: &str) -> Option<Initiative> {
        self.lock_state().cache.get(id).cloned()
    }

    pub fn filtered_initiatives(&self) -> Vec<Initiative> {
        let mut state = self.lock_state();
        if let Some((revision, cached)) = &state.filtered {
            if *revision == state.revision {
                return cached.clone();
            }
        }

        let needle = state.filter.search.to_lowercase();
        let computed: Vec<Initiative> = state
            .initiatives
            .iter()
            .filter(|initiative| {
                state
                    .filter
                    .status
                    .map_or(true, |status| initiative.status == status)
                    && (needle.is_empty()
                        || initiative.name.to_lowercase().contains(&needle)
                        || initiative
                            .description
                            .as_deref()
                            .is_some_and(|d| d.to_lowercase().contains(&needle)))
            })
            .cloned()
            .collect();
        state.filtered = Some((state.revision, computed.clone()));
        computed
    }

    pub fn counts_by_status(&self) -> HashMap<InitiativeStatus, usize> {
        let mut state = self.lock_state();
        if let Some((revision, cached)) = &state.counts {
            if *revision == state.revision {
                return cached.clone();
            }
        }

        let mut counts: HashMap<InitiativeStatus, usize> = InitiativeStatus::ALL
            .iter()
            .map(|status| (*status, 0))
            .collect();
        for initiative in &state.initiatives {
            *counts.entry(initiative.status).or_insert(0) += 1;
        }
        state.counts = Some((state.revision, counts.clone()));
        counts
    }

    pub fn set_filter(&self, filter: InitiativeFilter) {
        let mut state = self.lock_state();
        if state.filter != filter {
            state.filter = filter;
            state.bump();
        }
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock_state().last_error.clone()
    }

    // -----------------------------------------------------------------------
    // Real-time ingestion
    // -----------------------------------------------------------------------

    fn connect(self: &Arc<Self>) {
        let mut subscriptions = self.lock_subscriptions();
        let weak = Arc::downgrade(self);

        for (event_type, created) in [(INITIATIVE_CREATED, true), (INITIATIVE_UPDATED, false)] {
            let weak = weak.clone();
            subscriptions.push(self.sync.subscribe(
                event_type,
                Arc::new(move |event| {
                    if let (Some(store), SyncPayload::Initiative(initiative)) =
                        (weak.upgrade(), &event.payload)
                    {
                        store.ingest_upsert(initiative, created);
                    }
                }),
            ));
        }

        subscriptions.push(self.sync.subscribe(
            INITIATIVE_DELETED,
            Arc::new(move |event| {
                if let (Some(store), SyncPayload::Initiative(initiative)) =
                    (weak.upgrade(), &event.payload)
                {
                    store.lock_state().remove(&initiative.id);
                }
            }),
        ));
    }

    pub fn disconnect(&self) {
        for subscription in self.lock_subscriptions().drain(..) {
            subscription.unsubscribe();
        }
    }

    fn ingest_upsert(&self, initiative: &Initiative, created: bool) {
        if !self.in_scope(initiative) {
            if !created {
                self.lock_state().remove(&initiative.id);
            }
            return;
        }
        self.lock_state().merge(initiative.clone());
    }

    fn in_scope(&self, initiative: &Initiative) -> bool {
        self.scope
            .as_ref()
            .map_or(true, |project| &initiative.project == project)
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, InitiativeState> {
        self.state.lock().expect("initiative state poisoned")
    }

    fn lock_subscriptions(&self) -> std::sync::MutexGuard<'_, Vec<SyncSubscription>> {
        self.subscriptions.lock().expect("subscription list poisoned")
    }
}
