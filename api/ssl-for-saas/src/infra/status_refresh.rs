use crate::service::metrics_service;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::fmt::Debug;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub type RefreshResult<T> = Result<T, RefreshError>;

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("status refresh request failed: {0}")]
    Transport(String),

    #[error("status refresh rejected: status={0}")]
    Rejected(u16),
}

/// Nudges the external reconciler to pull upstream state into a job record.
#[async_trait]
pub trait StatusRefreshTrigger: Send + Sync + Debug {
    async fn notify(&self, job_id: &str) -> RefreshResult<()>;
}

#[derive(Debug, Clone)]
pub struct HttpStatusRefreshTrigger {
    client: Client,
    url: String,
}

impl HttpStatusRefreshTrigger {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl StatusRefreshTrigger for HttpStatusRefreshTrigger {
    async fn notify(&self, job_id: &str) -> RefreshResult<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "job_id": job_id }))
            .send()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(RefreshError::Rejected(status.as_u16()));
        }
        Ok(())
    }
}

/// Fire-and-forget: the caller never waits and a failure is only logged.
pub fn spawn_refresh(
    trigger: Option<Arc<dyn StatusRefreshTrigger>>,
    job_id: &str,
) -> Option<JoinHandle<()>> {
    let Some(trigger) = trigger else {
        debug!(job_id = %job_id, "status refresh not configured");
        return None;
    };
    let job_id = job_id.to_string();
    Some(tokio::spawn(async move {
        if let Err(e) = trigger.notify(&job_id).await {
            metrics_service::inc_refresh_failures();
            warn!(job_id = %job_id, error = %e, "status refresh trigger failed");
        }
    }))
}
