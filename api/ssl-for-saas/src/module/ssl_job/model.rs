use super::schema::{DistStageStatus, JobType, StageStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CertEntry {
    pub cert_arn: String,
    pub domain_name: String,
    #[serde(default)]
    pub san_list: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DistEntry {
    pub distribution_id: String,
    pub distribution_arn: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SslJobRecord {
    pub job_id: String,
    pub job_type: JobType,
    pub job_input: Value,
    pub create_count: u32,
    pub dist_count: u32,
    pub completed_cert_count: u32,
    pub completed_dist_count: u32,
    pub cert_stage_status: StageStatus,
    pub validation_stage_status: StageStatus,
    pub dist_stage_status: DistStageStatus,
    pub prompt_info: String,
    pub validation_message: String,
    pub cert_list: Vec<CertEntry>,
    pub dist_list: Vec<DistEntry>,
    pub creation_timestamp: i64,
    pub updated_at: i64,
}

/// Partial write against one job. `None` leaves a field untouched; the list
/// fields are appended, never replaced.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobFieldUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_stage_status: Option<StageStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_stage_status: Option<StageStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dist_stage_status: Option<DistStageStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_cert_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_dist_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub append_certs: Vec<CertEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub append_dists: Vec<DistEntry>,
}

impl JobFieldUpdate {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            cert_stage_status: Some(StageStatus::Failed),
            prompt_info: Some(message.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("cert stage cannot move from {from} to {to}")]
    CertStage { from: StageStatus, to: StageStatus },

    #[error("validation stage cannot move to {to} before cert stage is SUCCESS")]
    ValidationBeforeCert { to: StageStatus },

    #[error("validation stage cannot move from {from} to {to}")]
    ValidationStage { from: StageStatus, to: StageStatus },

    #[error("dist stage cannot move from {from} to {to}")]
    DistStage {
        from: DistStageStatus,
        to: DistStageStatus,
    },

    #[error("{field} cannot exceed {limit} (got {value})")]
    CountExceeded {
        field: &'static str,
        value: u32,
        limit: u32,
    },

    #[error("{field} cannot decrease from {from} to {to}")]
    CountDecreased {
        field: &'static str,
        from: u32,
        to: u32,
    },
}

impl SslJobRecord {
    /// Fresh job as accepted by the orchestrator. Distribution work is only
    /// expected when the request asked for automatic creation.
    pub fn new(
        job_id: String,
        job_type: JobType,
        job_input: Value,
        create_count: u32,
        auto_creation: bool,
        now: i64,
    ) -> Self {
        Self {
            job_id,
            job_type,
            job_input,
            create_count,
            dist_count: if auto_creation { create_count } else { 0 },
            completed_cert_count: 0,
            completed_dist_count: 0,
            cert_stage_status: StageStatus::InProgress,
            validation_stage_status: StageStatus::NotStarted,
            dist_stage_status: if auto_creation {
                DistStageStatus::NotStarted
            } else {
                DistStageStatus::NoNeed
            },
            prompt_info: String::new(),
            validation_message: String::new(),
            cert_list: Vec::new(),
            dist_list: Vec::new(),
            creation_timestamp: now,
            updated_at: now,
        }
    }

    /// Neither the cert nor the distribution stage expects another write.
    pub fn is_terminal(&self) -> bool {
        self.cert_stage_status.is_terminal() && self.dist_stage_status.is_terminal()
    }

    /// Applies `update` all-or-nothing: on error the record is unchanged.
    pub fn apply(&mut self, update: &JobFieldUpdate, now: i64) -> Result<(), TransitionError> {
        let mut next = self.clone();

        if let Some(to) = update.cert_stage_status {
            let from = next.cert_stage_status;
            if !cert_transition_allowed(from, to) {
                return Err(TransitionError::CertStage { from, to });
            }
            next.cert_stage_status = to;
        }

        if let Some(to) = update.validation_stage_status {
            let from = next.validation_stage_status;
            if from != to {
                if from == StageStatus::NotStarted
                    && next.cert_stage_status != StageStatus::Success
                {
                    return Err(TransitionError::ValidationBeforeCert { to });
                }
                if !validation_transition_allowed(from, to) {
                    return Err(TransitionError::ValidationStage { from, to });
                }
            }
            next.validation_stage_status = to;
        }

        if let Some(to) = update.dist_stage_status {
            let from = next.dist_stage_status;
            if !dist_transition_allowed(from, to) {
                return Err(TransitionError::DistStage { from, to });
            }
            next.dist_stage_status = to;
        }

        if let Some(value) = update.completed_cert_count {
            next.completed_cert_count = checked_count(
                "completed_cert_count",
                next.completed_cert_count,
                value,
                next.create_count,
            )?;
        }
        if let Some(value) = update.completed_dist_count {
            next.completed_dist_count = checked_count(
                "completed_dist_count",
                next.completed_dist_count,
                value,
                next.dist_count,
            )?;
        }

        if let Some(prompt_info) = &update.prompt_info {
            next.prompt_info = prompt_info.clone();
        }
        if let Some(message) = &update.validation_message {
            next.validation_message = message.clone();
        }
        next.cert_list.extend(update.append_certs.iter().cloned());
        next.dist_list.extend(update.append_dists.iter().cloned());
        next.updated_at = now;

        *self = next;
        Ok(())
    }
}

/// Explicit per-request context threaded through the orchestrator.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub job_id: String,
    pub received_at: i64,
}

impl RequestContext {
    pub fn new(received_at: i64) -> Self {
        Self {
            job_id: generate_job_id(),
            received_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Completed(String),
    Delegated(String),
}

impl ProvisionOutcome {
    pub fn job_id(&self) -> &str {
        match self {
            Self::Completed(job_id) | Self::Delegated(job_id) => job_id,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::Delegated(_) => "delegated",
        }
    }
}

pub fn generate_job_id() -> String {
    Uuid::new_v4().to_string()
}

fn cert_transition_allowed(from: StageStatus, to: StageStatus) -> bool {
    from == to
        || matches!(
            (from, to),
            (StageStatus::NotStarted, StageStatus::InProgress)
                | (StageStatus::InProgress, StageStatus::Success)
                | (StageStatus::InProgress, StageStatus::Failed)
        )
}

fn validation_transition_allowed(from: StageStatus, to: StageStatus) -> bool {
    matches!(
        (from, to),
        (StageStatus::NotStarted, StageStatus::InProgress)
            | (StageStatus::NotStarted, StageStatus::Success)
            | (StageStatus::NotStarted, StageStatus::Failed)
            | (StageStatus::InProgress, StageStatus::Success)
            | (StageStatus::InProgress, StageStatus::Failed)
    )
}

fn dist_transition_allowed(from: DistStageStatus, to: DistStageStatus) -> bool {
    from == to
        || matches!(
            (from, to),
            (DistStageStatus::NotStarted, DistStageStatus::InProgress)
                | (DistStageStatus::NotStarted, DistStageStatus::Success)
                | (DistStageStatus::NotStarted, DistStageStatus::Failed)
                | (DistStageStatus::InProgress, DistStageStatus::Success)
                | (DistStageStatus::InProgress, DistStageStatus::Failed)
        )
}

fn checked_count(
    field: &'static str,
    current: u32,
    value: u32,
    limit: u32,
) -> Result<u32, TransitionError> {
    if value > limit {
        return Err(TransitionError::CountExceeded {
            field,
            value,
            limit,
        });
    }
    if value < current {
        return Err(TransitionError::CountDecreased {
            field,
            from: current,
            to: value,
        });
    }
    Ok(value)
}
