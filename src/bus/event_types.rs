//! Sync event type tags.
//!
//! Single source of truth for the closed set of tags used on both the emit
//! and subscribe sides. Any new entity type adds its own
//! `<entity>-created/-updated/-deleted` triad following this convention.

pub const TASK_CREATED: &str = "task-created";
pub const TASK_UPDATED: &str = "task-updated";
pub const TASK_DELETED: &str = "task-deleted";

pub const INITIATIVE_CREATED: &str = "initiative-created";
pub const INITIATIVE_UPDATED: &str = "initiative-updated";
pub const INITIATIVE_DELETED: &str = "initiative-deleted";

pub const PROJECT_CREATED: &str = "project-created";
pub const PROJECT_UPDATED: &str = "project-updated";
pub const PROJECT_DELETED: &str = "project-deleted";

pub const ALL_SYNC_EVENTS: [&str; 9] = [
    TASK_CREATED,
    TASK_UPDATED,
    TASK_DELETED,
    INITIATIVE_CREATED,
    INITIATIVE_UPDATED,
    INITIATIVE_DELETED,
    PROJECT_CREATED,
    PROJECT_UPDATED,
    PROJECT_DELETED,
];

pub fn is_sync_event(event_type: &str) -> bool {
    ALL_SYNC_EVENTS.contains(&event_type)
}
