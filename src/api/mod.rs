//! Remote entity API boundary.
//!
//! The sync core never talks to the network directly: stores depend on these
//! traits, and `rest` provides the HTTP implementation. Tests substitute
//! in-memory mocks with controllable resolution.

pub mod rest;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::model::{
    Initiative, InitiativePatch, NewInitiative, NewProject, NewTask, Project, ProjectPatch, Task,
    TaskPatch, TaskStatus,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("server error ({status}): {message}")]
    Status { status: u16, message: String },
    #[error("invalid response body: {0}")]
    Decode(String),
}

/// Server-side list filter. Empty query returns everything the caller can
/// see; stores scoped to one project pass it here so refreshes stay narrow.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InitiativeQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn list(&self, query: &TaskQuery) -> Result<Vec<Task>, ApiError>;
    async fn get(&self, id: &str) -> Result<Option<Task>, ApiError>;
    async fn create(&self, draft: &NewTask) -> Result<Task, ApiError>;
    async fn update(&self, id: &str, patch: &TaskPatch) -> Result<Task, ApiError>;
    async fn delete(&self, id: &str) -> Result<(), ApiError>;
}

#[async_trait]
pub trait InitiativeApi: Send + Sync {
    async fn list(&self, query: &InitiativeQuery) -> Result<Vec<Initiative>, ApiError>;
    async fn get(&self, id: &str) -> Result<Option<Initiative>, ApiError>;
    async fn create(&self, draft: &NewInitiative) -> Result<Initiative, ApiError>;
    async fn update(&self, id: &str, patch: &InitiativePatch) -> Result<Initiative, ApiError>;
    async fn delete(&self, id: &str) -> Result<(), ApiError>;
}

#[async_trait]
pub trait ProjectApi: Send + Sync {
    async fn list(&self) -> Result<Vec<Project>, ApiError>;
    async fn get(&self, id: &str) -> Result<Option<Project>, ApiError>;
    async fn create(&self, draft: &NewProject) -> Result<Project, ApiError>;
    async fn update(&self, id: &str, patch: &ProjectPatch) -> Result<Project, ApiError>;
    async fn delete(&self, id: &str) -> Result<(), ApiError>;
}
