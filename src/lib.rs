//! Client-side real-time sync core for a task/initiative tracker.
//!
//! This crate is the synchronization layer that sits between a UI and its
//! remote entity API. It handles:
//! - In-process publish/subscribe with listener lifecycle diagnostics
//! - Optimistic mutations with temporary ids, confirm-swap, and rollback
//! - Duplicate collapse and deterministic ordering of entity lists
//! - Derived views (filtered lists, per-status counts) with memoization
//!
//! # Architecture
//!
//! The core follows a modular architecture:
//! - `bus`: Typed event bus for real-time fan-out within one process
//! - `sync`: Domain sync service over the bus, plus the cache-invalidation
//!   hook
//! - `core`: Pure dedup/sort engine
//! - `store`: Optimistic per-entity state containers
//! - `model`: Entity records, statuses, drafts, and patches
//! - `api`: Remote API traits and the REST adapter
//! - `prefs`: Persisted UI preference store
//!
//! Data flows UI action → store (optimistic mutation) → API client → on
//! success a sync event fans out through the bus → every subscribed store
//! merges it through the dedup/sort engine → views re-render. Stores never
//! share state directly; the bus is the only cross-store channel.

pub mod api;
pub mod bus;
pub mod core;
pub mod model;
pub mod prefs;
pub mod store;
pub mod sync;

#[cfg(test)]
mod testing;

#[cfg(test)]
mod tests;

pub use api::{ApiError, InitiativeApi, ProjectApi, TaskApi};
pub use bus::{BusEvent, EventBus, Subscription};
pub use store::{InitiativeStore, ProjectStore, StoreError, TaskStore};
pub use sync::{QueryInvalidator, SyncEvent, SyncPayload, SyncService};
