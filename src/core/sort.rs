//! Deterministic orderings for store views.
//!
//! All sorts are stable, so records whose sort key compares equal keep their
//! relative order from the previous pass.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::Record;
use crate::model::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Created,
    Updated,
    Priority,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            Self::Asc => ord,
            Self::Desc => ord.reverse(),
        }
    }
}

/// Persisted sort choice for a task list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            key: SortKey::Created,
            direction: SortDirection::Desc,
        }
    }
}

/// Stable newest-first ordering by `created_at`.
pub fn sort_newest_first<T: Record>(records: &mut [T]) {
    records.sort_by(|a, b| b.created_at().cmp(a.created_at()));
}

/// Sort tasks by the given key; `direction` multiplies the comparator.
///
/// Priority magnitude is high > medium > low. Status magnitude follows the
/// lifecycle progression with earlier-lifecycle statuses as the larger
/// values, so descending mode surfaces actionable work (inbox, todo) ahead
/// of finished work (done, archived).
pub fn sort_tasks(tasks: &mut [Task], key: SortKey, direction: SortDirection) {
    tasks.sort_by(|a, b| {
        let ord = match key {
            SortKey::Created => a.created_at.cmp(&b.created_at),
            SortKey::Updated => a.updated_at.cmp(&b.updated_at),
            SortKey::Priority => a.priority.rank().cmp(&b.priority.rank()),
            SortKey::Status => b
                .status
                .progression_index()
                .cmp(&a.status.progression_index()),
        };
        direction.apply(ord)
    });
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{Priority, TaskStatus};

    fn task(id: &str, created_at: &str, status: TaskStatus, priority: Priority) -> Task {
        Task {
            id: id.to_string(),
            title: id.to_string(),
            project: "core".to_string(),
            status,
            priority,
            notes: None,
            created_at: created_at.to_string(),
            updated_at: created_at.to_string(),
            provisional: false,
        }
    }

    #[test]
    fn test_sort_newest_first() {
        let mut tasks = vec![
            task("a", "2025-03-01T00:00:00Z", TaskStatus::Todo, Priority::Low),
            task("b", "2025-03-03T00:00:00Z", TaskStatus::Todo, Priority::Low),
            task("c", "2025-03-02T00:00:00Z", TaskStatus::Todo, Priority::Low),
        ];
        sort_newest_first(&mut tasks);
        let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_sort_by_priority_descending_puts_high_first() {
        let mut tasks = vec![
            task("low", "2025-03-01T00:00:00Z", TaskStatus::Todo, Priority::Low),
            task("high", "2025-03-01T00:00:00Z", TaskStatus::Todo, Priority::High),
            task("med", "2025-03-01T00:00:00Z", TaskStatus::Todo, Priority::Medium),
        ];
        sort_tasks(&mut tasks, SortKey::Priority, SortDirection::Desc);
        let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "med", "low"]);
    }

    #[test]
    fn test_sort_by_status_descending_puts_earlier_lifecycle_first() {
        let mut tasks = vec![
            task("done", "2025-03-01T00:00:00Z", TaskStatus::Done, Priority::Medium),
            task("inbox", "2025-03-01T00:00:00Z", TaskStatus::Inbox, Priority::Medium),
            task("wip", "2025-03-01T00:00:00Z", TaskStatus::InProgress, Priority::Medium),
        ];
        sort_tasks(&mut tasks, SortKey::Status, SortDirection::Desc);
        let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["inbox", "wip", "done"]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_keys() {
        let mut tasks = vec![
            task("first", "2025-03-01T00:00:00Z", TaskStatus::Todo, Priority::Medium),
            task("second", "2025-03-01T00:00:00Z", TaskStatus::Todo, Priority::Medium),
            task("third", "2025-03-01T00:00:00Z", TaskStatus::Todo, Priority::Medium),
        ];
        sort_tasks(&mut tasks, SortKey::Created, SortDirection::Desc);
        let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_direction_multiplies_comparator() {
        let mut tasks = vec![
            task("b", "2025-03-02T00:00:00Z", TaskStatus::Todo, Priority::Medium),
            task("a", "2025-03-01T00:00:00Z", TaskStatus::Todo, Priority::Medium),
        ];
        sort_tasks(&mut tasks, SortKey::Created, SortDirection::Asc);
        assert_eq!(tasks[0].id, "a");
        sort_tasks(&mut tasks, SortKey::Created, SortDirection::Desc);
        assert_eq!(tasks[0].id, "b");
    }
}
