//! Optimistic per-entity state containers.
//!
//! Each store owns the authoritative in-memory list for one entity type
//! within a UI scope. Mutations apply locally first (before any network
//! round trip), then reconcile with the server response: a confirmed create
//! swaps the temporary record for the real one and emits a sync event; a
//! failure restores the pre-mutation snapshot and triggers a refresh from
//! the authoritative source.
//!
//! # Architecture
//!
//! Stores never share state directly. Convergence across stores (and across
//! views of the same entity type) happens only through `SyncService` events,
//! which each store ingests through the same dedup/re-sort path it uses for
//! its own mutations; self-notification is an expected no-op rather than a
//! special case.

mod initiatives;
mod projects;
mod tasks;

pub use initiatives::{InitiativeFilter, InitiativeStore};
pub use projects::ProjectStore;
pub use tasks::{TaskFilter, TaskStore, TaskStoreOptions};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Api(#[from] crate::api::ApiError),
}
