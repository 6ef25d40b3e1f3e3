use crate::infra::certificate_provider::ProviderError;
use crate::infra::job_store::StoreError;
use crate::infra::notifier::NotifyError;
use crate::infra::workflow::WorkflowError;
use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AppError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl AppError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code,
            message: message.into(),
        }
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            code,
            message: message.into(),
        }
    }

    pub fn unauthorized(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code,
            message: message.into(),
        }
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code,
            message: message.into(),
        }
    }

    pub fn internal(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code,
            message: message.into(),
        }
    }
}

/// Everything that can stop a provisioning request or a job query.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("auto_creation is not true or false: {0:?}")]
    UnsupportedAutoCreation(String),

    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Notification(#[from] NotifyError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("job not found: {0:?}")]
    JobNotFound(String),
}

impl ProvisionError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::UnsupportedAutoCreation(_) => "AUTO_CREATION_INVALID",
            Self::InvalidCertificate(_) => "INVALID_CERTIFICATE",
            Self::Provider(_) => "PROVIDER_FAILURE",
            Self::Store(StoreError::NotFound(_)) => "JOB_NOT_FOUND",
            Self::Store(StoreError::Transition(_)) => "INVALID_STAGE_TRANSITION",
            Self::Store(StoreError::DuplicateJob(_)) => "DUPLICATE_JOB",
            Self::Store(_) => "STORE_FAILURE",
            Self::Notification(_) => "NOTIFICATION_FAILURE",
            Self::Workflow(_) => "WORKFLOW_FAILURE",
            Self::JobNotFound(_) => "JOB_NOT_FOUND",
        }
    }
}

impl From<ProvisionError> for AppError {
    fn from(err: ProvisionError) -> Self {
        let code = err.code();
        let message = err.to_string();
        match err {
            ProvisionError::InvalidRequest(_) => AppError::bad_request(code, message),
            ProvisionError::JobNotFound(_) | ProvisionError::Store(StoreError::NotFound(_)) => {
                AppError::not_found(code, message)
            }
            ProvisionError::Store(StoreError::Transition(_)) => AppError::conflict(code, message),
            _ => AppError::internal(code, message),
        }
    }
}
