//! Entity records and their status enumerations.
//!
//! All timestamps are RFC 3339 strings (`Utc::now().to_rfc3339()`), so
//! lexicographic comparison is recency comparison. The `provisional` flag
//! marks optimistic records that have not been confirmed by the server yet;
//! it is client-local and skipped during serialization when false.

use serde::{Deserialize, Serialize};

use crate::core::Record;

// ---------------------------------------------------------------------------
// Status enumerations
// ---------------------------------------------------------------------------

/// Task lifecycle statuses, ordered by progression. The declaration order is
/// the canonical sort order for status-based sorting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Inbox,
    Brainstorm,
    Proposed,
    Backlog,
    Maybe,
    Todo,
    InProgress,
    OnHold,
    ForReview,
    Done,
    Reviewed,
    Archived,
}

impl TaskStatus {
    /// Canonical lifecycle progression, earliest first.
    pub const PROGRESSION: [Self; 12] = [
        Self::Inbox,
        Self::Brainstorm,
        Self::Proposed,
        Self::Backlog,
        Self::Maybe,
        Self::Todo,
        Self::InProgress,
        Self::OnHold,
        Self::ForReview,
        Self::Done,
        Self::Reviewed,
        Self::Archived,
    ];

    /// Position in the lifecycle progression (0 = earliest).
    pub fn progression_index(self) -> usize {
        match self {
            Self::Inbox => 0,
            Self::Brainstorm => 1,
            Self::Proposed => 2,
            Self::Backlog => 3,
            Self::Maybe => 4,
            Self::Todo => 5,
            Self::InProgress => 6,
            Self::OnHold => 7,
            Self::ForReview => 8,
            Self::Done => 9,
            Self::Reviewed => 10,
            Self::Archived => 11,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inbox => "inbox",
            Self::Brainstorm => "brainstorm",
            Self::Proposed => "proposed",
            Self::Backlog => "backlog",
            Self::Maybe => "maybe",
            Self::Todo => "todo",
            Self::InProgress => "in-progress",
            Self::OnHold => "on-hold",
            Self::ForReview => "for-review",
            Self::Done => "done",
            Self::Reviewed => "reviewed",
            Self::Archived => "archived",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Numeric rank for sorting; higher ranks sort first in descending mode.
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 2,
            Self::Medium => 1,
            Self::Low => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InitiativeStatus {
    #[default]
    Proposed,
    Active,
    OnHold,
    Completed,
    Archived,
}

impl InitiativeStatus {
    pub const ALL: [Self; 5] = [
        Self::Proposed,
        Self::Active,
        Self::OnHold,
        Self::Completed,
        Self::Archived,
    ];
}

// ---------------------------------------------------------------------------
// Entity records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub project: String,
    pub status: TaskStatus,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub provisional: bool,
}

impl Task {
    /// Natural identity used to catch duplicates that received two ids.
    pub fn secondary_key(&self) -> String {
        format!("{}::{}", self.title, self.project)
    }
}

impl Record for Task {
    fn id(&self) -> &str {
        &self.id
    }
    fn created_at(&self) -> &str {
        &self.created_at
    }
    fn updated_at(&self) -> &str {
        &self.updated_at
    }
    fn provisional(&self) -> bool {
        self.provisional
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Initiative {
    pub id: String,
    pub name: String,
    pub project: String,
    pub status: InitiativeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub provisional: bool,
}

impl Initiative {
    pub fn secondary_key(&self) -> String {
        format!("{}::{}", self.name, self.project)
    }
}

impl Record for Initiative {
    fn id(&self) -> &str {
        &self.id
    }
    fn created_at(&self) -> &str {
        &self.created_at
    }
    fn updated_at(&self) -> &str {
        &self.updated_at
    }
    fn provisional(&self) -> bool {
        self.provisional
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub provisional: bool,
}

impl Project {
    pub fn secondary_key(&self) -> String {
        self.name.clone()
    }
}

impl Record for Project {
    fn id(&self) -> &str {
        &self.id
    }
    fn created_at(&self) -> &str {
        &self.created_at
    }
    fn updated_at(&self) -> &str {
        &self.updated_at
    }
    fn provisional(&self) -> bool {
        self.provisional
    }
}

// ---------------------------------------------------------------------------
// Drafts and patches
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub project: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Merge the patch into `task`, leaving absent fields untouched.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(project) = &self.project {
            task.project = project.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(notes) = &self.notes {
            task.notes = Some(notes.clone());
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewInitiative {
    pub name: String,
    pub project: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<InitiativeStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitiativePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<InitiativeStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl InitiativePatch {
    pub fn status(status: InitiativeStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn apply_to(&self, initiative: &mut Initiative) {
        if let Some(name) = &self.name {
            initiative.name = name.clone();
        }
        if let Some(project) = &self.project {
            initiative.project = project.clone();
        }
        if let Some(status) = self.status {
            initiative.status = status;
        }
        if let Some(description) = &self.description {
            initiative.description = Some(description.clone());
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ProjectPatch {
    pub fn apply_to(&self, project: &mut Project) {
        if let Some(name) = &self.name {
            project.name = name.clone();
        }
        if let Some(description) = &self.description {
            project.description = Some(description.clone());
        }
    }
}
