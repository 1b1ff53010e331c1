//! Pure list hygiene over entity records.
//!
//! Everything in this module is side-effect free: deduplication collapses
//! records that share a primary id or a secondary natural key, and the sort
//! functions produce the deterministic orderings the stores render from.

pub mod dedup;
pub mod sort;

pub use dedup::{dedup_by_id, dedup_by_key};
pub use sort::{sort_newest_first, sort_tasks, SortConfig, SortDirection, SortKey};

/// Minimal record surface the dedup/sort engine needs from an entity.
///
/// Timestamps are RFC 3339 strings, so `str` comparison is recency
/// comparison. `provisional` marks optimistic copies that lose ties against
/// confirmed ones.
pub trait Record {
    fn id(&self) -> &str;
    fn created_at(&self) -> &str;
    fn updated_at(&self) -> &str;
    fn provisional(&self) -> bool {
        false
    }
}
