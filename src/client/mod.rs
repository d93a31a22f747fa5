//! HTTP client for the task API.
//!
//! [`ApiClient`] performs the round trips; [`sync::SyncState`] layers the
//! local collection and its reconciliation rules on top.

pub mod sync;

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::ClientConfig;
use crate::types::{Health, Task, TaskPatch};

/// Failure classes the client distinguishes.
///
/// User-facing messaging depends on the distinction: no response at all,
/// an error response, and an undecodable response are reported
/// differently and never conflated.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No response was received (connect failure or local timeout). The
    /// server-side write may still have completed.
    #[error("no se pudo conectar con el servidor: {0}")]
    Unreachable(#[source] reqwest::Error),

    /// The server responded with an error status.
    #[error("error {status}: {message}")]
    Api { status: u16, message: String },

    /// A response arrived but its body was not the expected shape.
    #[error("respuesta malformada del servidor")]
    Malformed(#[source] reqwest::Error),
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// JSON error body the service produces for 4xx/5xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Thin typed wrapper over the REST endpoints.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client with the configured base URL and request timeout.
    pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turn a response into `T`, extracting the JSON error body on
    /// non-success statuses.
    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> ClientResult<T> {
        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(ClientError::Malformed);
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .map(|body| body.error)
            .unwrap_or_else(|_| "Error del servidor".to_string());

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// `GET /health`.
    ///
    /// Both the healthy and unhealthy shapes decode to [`Health`]; only
    /// transport failures are errors here. Callers inspect
    /// [`Health::database_connected`].
    pub async fn health(&self) -> ClientResult<Health> {
        let response = self
            .http
            .get(self.url("/health"))
            .send()
            .await
            .map_err(ClientError::Unreachable)?;

        let status = response.status();
        let health = response
            .json::<Health>()
            .await
            .map_err(ClientError::Malformed)?;
        debug!(status = status.as_u16(), database = %health.database, "health check");
        Ok(health)
    }

    /// `GET /tasks`.
    pub async fn list_tasks(&self) -> ClientResult<Vec<Task>> {
        let response = self
            .http
            .get(self.url("/tasks"))
            .send()
            .await
            .map_err(ClientError::Unreachable)?;
        Self::decode(response).await
    }

    /// `GET /tasks/{id}`.
    pub async fn get_task(&self, id: i64) -> ClientResult<Task> {
        let response = self
            .http
            .get(self.url(&format!("/tasks/{id}")))
            .send()
            .await
            .map_err(ClientError::Unreachable)?;
        Self::decode(response).await
    }

    /// `POST /tasks`.
    pub async fn create_task(&self, title: &str) -> ClientResult<Task> {
        let response = self
            .http
            .post(self.url("/tasks"))
            .json(&serde_json::json!({ "title": title }))
            .send()
            .await
            .map_err(ClientError::Unreachable)?;
        Self::decode(response).await
    }

    /// `PUT /tasks/{id}`, sending only the populated patch fields.
    pub async fn update_task(&self, id: i64, patch: &TaskPatch) -> ClientResult<Task> {
        let response = self
            .http
            .put(self.url(&format!("/tasks/{id}")))
            .json(patch)
            .send()
            .await
            .map_err(ClientError::Unreachable)?;
        Self::decode(response).await
    }

    /// `DELETE /tasks/{id}`. Returns the task's state prior to deletion.
    pub async fn delete_task(&self, id: i64) -> ClientResult<Task> {
        #[derive(Deserialize)]
        struct DeleteBody {
            #[serde(rename = "deletedTask")]
            deleted_task: Task,
        }

        let response = self
            .http
            .delete(self.url(&format!("/tasks/{id}")))
            .send()
            .await
            .map_err(ClientError::Unreachable)?;

        let body: DeleteBody = Self::decode(response).await?;
        Ok(body.deleted_task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = ApiClient::new(&ClientConfig {
            base_url: "http://localhost:5000/".into(),
            timeout_seconds: 1,
        })
        .unwrap();
        assert_eq!(client.url("/tasks"), "http://localhost:5000/tasks");
    }
}
