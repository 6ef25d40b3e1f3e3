use crate::module::ssl_job::schema::ResolvedWorkflowRequest;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;
use tracing::warn;

pub type WorkflowResult<T> = Result<T, WorkflowError>;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("workflow engine is not configured")]
    NotConfigured,

    #[error("workflow {workflow_id} invocation failed: {message}")]
    Invoke {
        workflow_id: String,
        message: String,
    },
}

/// Out-of-process engine that runs automatic provisioning end to end.
#[async_trait]
pub trait WorkflowDelegate: Send + Sync + Debug {
    /// Starts an execution and returns the engine's execution reference.
    async fn invoke(
        &self,
        workflow_id: &str,
        request: &ResolvedWorkflowRequest,
    ) -> WorkflowResult<String>;
}

#[derive(Debug, Clone)]
pub struct HttpWorkflowDelegate {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct StartExecutionBody<'a> {
    workflow_id: &'a str,
    input: &'a ResolvedWorkflowRequest,
}

#[derive(Debug, Deserialize)]
struct StartExecutionReply {
    #[serde(default)]
    execution_id: String,
}

impl HttpWorkflowDelegate {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl WorkflowDelegate for HttpWorkflowDelegate {
    async fn invoke(
        &self,
        workflow_id: &str,
        request: &ResolvedWorkflowRequest,
    ) -> WorkflowResult<String> {
        let fail = |message: String| WorkflowError::Invoke {
            workflow_id: workflow_id.to_string(),
            message,
        };
        let response = self
            .client
            .post(format!("{}/executions", self.base_url))
            .json(&StartExecutionBody {
                workflow_id,
                input: request,
            })
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("status={}", status.as_u16())));
        }
        // The engine accepted the run; an unreadable reply only loses its id.
        match response.json::<StartExecutionReply>().await {
            Ok(reply) => Ok(reply.execution_id),
            Err(e) => {
                warn!(workflow_id, error = %e, "execution reply not decodable");
                Ok(String::new())
            }
        }
    }
}
