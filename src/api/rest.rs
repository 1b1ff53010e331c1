//! HTTP implementation of the entity API traits.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{ApiError, InitiativeApi, InitiativeQuery, ProjectApi, TaskApi, TaskQuery};
use crate::model::{
    Initiative, InitiativePatch, NewInitiative, NewProject, NewTask, Project, ProjectPatch, Task,
    TaskPatch,
};

/// Thin client over the application's REST API. One instance per base URL;
/// `reqwest::Client` pools connections internally.
pub struct RestClient {
    base_url: String,
    client: reqwest::Client,
}

impl RestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &impl Serialize,
    ) -> Result<T, ApiError> {
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Self::decode(response).await
    }

    async fn get_json_plain<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Self::decode(response).await
    }

    /// Like `get_json`, but maps a 404 to `Ok(None)`.
    async fn get_json_opt<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ApiError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::decode(response).await.map(Some)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, ApiError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Self::decode(response).await
    }

    async fn patch_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, ApiError> {
        let response = self
            .client
            .patch(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Self::decode(response).await
    }

    async fn delete_path(&self, path: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(self.url(path))
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Self::check_status(response).await.map(|_| ())
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let response = Self::check_status(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl TaskApi for RestClient {
    async fn list(&self, query: &TaskQuery) -> Result<Vec<Task>, ApiError> {
        self.get_json("/api/tasks", query).await
    }

    async fn get(&self, id: &str) -> Result<Option<Task>, ApiError> {
        self.get_json_opt(&format!("/api/tasks/{id}")).await
    }

    async fn create(&self, draft: &NewTask) -> Result<Task, ApiError> {
        self.post_json("/api/tasks", draft).await
    }

    async fn update(&self, id: &str, patch: &TaskPatch) -> Result<Task, ApiError> {
        self.patch_json(&format!("/api/tasks/{id}"), patch).await
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.delete_path(&format!("/api/tasks/{id}")).await
    }
}

#[async_trait]
impl InitiativeApi for RestClient {
    async fn list(&self, query: &InitiativeQuery) -> Result<Vec<Initiative>, ApiError> {
        self.get_json("/api/initiatives", query).await
    }

    async fn get(&self, id: &str) -> Result<Option<Initiative>, ApiError> {
        self.get_json_opt(&format!("/api/initiatives/{id}")).await
    }

    async fn create(&self, draft: &NewInitiative) -> Result<Initiative, ApiError> {
        self.post_json("/api/initiatives", draft).await
    }

    async fn update(&self, id: &str, patch: &InitiativePatch) -> Result<Initiative, ApiError> {
        self.patch_json(&format!("/api/initiatives/{id}"), patch).await
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.delete_path(&format!("/api/initiatives/{id}")).await
    }
}

#[async_trait]
impl ProjectApi for RestClient {
    async fn list(&self) -> Result<Vec<Project>, ApiError> {
        self.get_json_plain("/api/projects").await
    }

    async fn get(&self, id: &str) -> Result<Option<Project>, ApiError> {
        self.get_json_opt(&format!("/api/projects/{id}")).await
    }

    async fn create(&self, draft: &NewProject) -> Result<Project, ApiError> {
        self.post_json("/api/projects", draft).await
    }

    async fn update(&self, id: &str, patch: &ProjectPatch) -> Result<Project, ApiError> {
        self.patch_json(&format!("/api/projects/{id}"), patch).await
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.delete_path(&format!("/api/projects/{id}")).await
    }
}
