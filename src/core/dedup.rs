//! Duplicate collapse by primary id and by secondary natural key.
//!
//! Both passes keep the record with the latest `updated_at` per group and
//! preserve first-occurrence order, so running either pass twice yields the
//! same list as running it once.

use std::cmp::Ordering;
use std::collections::HashMap;

use super::Record;

/// Collapse records that share an `id`, keeping the one with the latest
/// `updated_at`. Records with an empty id would corrupt the id-keyed map and
/// are skipped with a warning instead.
pub fn dedup_by_id<T: Record + Clone>(records: &[T]) -> Vec<T> {
    collapse(records, |record| {
        let id = record.id();
        if id.is_empty() {
            None
        } else {
            Some(id.to_string())
        }
    })
}

/// Collapse records that share a secondary natural key. Run after
/// [`dedup_by_id`]: it absorbs the case where one logical entity was created
/// twice and received two different ids (an optimistic create racing a
/// retried submit).
pub fn dedup_by_key<T, F>(records: &[T], key_fn: F) -> Vec<T>
where
    T: Record + Clone,
    F: Fn(&T) -> String,
{
    collapse(records, |record| Some(key_fn(record)))
}

fn collapse<T, F>(records: &[T], group_key: F) -> Vec<T>
where
    T: Record + Clone,
    F: Fn(&T) -> Option<String>,
{
    let mut order: Vec<String> = Vec::with_capacity(records.len());
    let mut kept: HashMap<String, T> = HashMap::with_capacity(records.len());

    for record in records {
        let Some(key) = group_key(record) else {
            tracing::warn!("skipping record with missing id during dedup");
            continue;
        };
        match kept.get(&key) {
            None => {
                order.push(key.clone());
                kept.insert(key, record.clone());
            }
            Some(incumbent) => {
                if supersedes(record, incumbent) {
                    kept.insert(key, record.clone());
                }
            }
        }
    }

    order.into_iter().filter_map(|key| kept.remove(&key)).collect()
}

/// Later `updated_at` wins. On an exact timestamp tie the confirmed copy
/// beats the provisional one; otherwise the incumbent stays, which keeps the
/// result deterministic regardless of input order.
fn supersedes<T: Record>(candidate: &T, incumbent: &T) -> bool {
    match candidate.updated_at().cmp(incumbent.updated_at()) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => !candidate.provisional() && incumbent.provisional(),
    }
}
