use super::model::SslJobRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Create,
    Import,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Import => "import",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "create" => Some(Self::Create),
            "import" => Some(Self::Import),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageStatus {
    NotStarted,
    InProgress,
    Success,
    Failed,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::InProgress => "IN_PROGRESS",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DistStageStatus {
    NoNeed,
    NotStarted,
    InProgress,
    Success,
    Failed,
}

impl DistStageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoNeed => "NO_NEED",
            Self::NotStarted => "NOT_STARTED",
            Self::InProgress => "IN_PROGRESS",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::NoNeed | Self::Success | Self::Failed)
    }
}

impl fmt::Display for DistStageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pre-existing distribution a certificate should be attached to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceCfInfo {
    pub distribution_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_version_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CnameInput {
    #[serde(rename = "domainName", alias = "domain_name", default)]
    pub domain_name: String,
    #[serde(rename = "sanList", alias = "san_list", default)]
    pub san_list: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_cf_info: Option<SourceCfInfo>,
    #[serde(
        rename = "originsItemsDomainName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub origins_items_domain_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PemInput {
    #[serde(rename = "CertPem", default)]
    pub cert_pem: String,
    #[serde(rename = "ChainPem", default)]
    pub chain_pem: String,
    #[serde(rename = "PrivateKeyPem", default)]
    pub private_key_pem: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_cf_info: Option<SourceCfInfo>,
}

/// Body of `POST /ssl_for_saas`. Every field is optional on the wire so the
/// validator, not the extractor, decides what a malformed request is.
/// `auto_creation` stays untyped: a non-string flag is an unsupported mode,
/// not a decode failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SslForSaasRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acm_op: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_creation: Option<serde_json::Value>,
    #[serde(rename = "cnameList", default, skip_serializing_if = "Option::is_none")]
    pub cname_list: Option<Vec<CnameInput>>,
    #[serde(rename = "pemList", default, skip_serializing_if = "Option::is_none")]
    pub pem_list: Option<Vec<PemInput>>,
}

/// Request handed to the workflow engine once import bundles are resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedWorkflowRequest {
    pub job_id: String,
    pub acm_op: JobType,
    pub auto_creation: String,
    #[serde(rename = "cnameList")]
    pub cname_list: Vec<CnameInput>,
    #[serde(rename = "pemList")]
    pub pem_list: Vec<PemInput>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationMethod {
    Dns,
    Email,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DomainValidationOption {
    pub domain_name: String,
    pub validation_method: ValidationMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_record: Option<ResourceRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CertificateTag {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CertificateSummary {
    pub cert_arn: String,
    pub domain_name: String,
    #[serde(default)]
    pub san_list: Vec<String>,
    pub status: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// `?job_id=` or `?jobId=`; both spellings are in use by callers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobIdQuery {
    #[serde(default, alias = "jobId")]
    pub job_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error_code: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobProgressResponse {
    pub updated: bool,
    pub job: Option<SslJobRecord>,
    pub error_code: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthMetricsView {
    pub jobs_created: u64,
    pub jobs_completed: u64,
    pub jobs_delegated: u64,
    pub jobs_failed: u64,
    pub certificates_requested: u64,
    pub certificates_imported: u64,
    pub refresh_failures: u64,
    pub last_error_ts: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub store_backend: String,
    pub provider_backend: String,
    pub notifier_backend: String,
    pub workflow_configured: bool,
    pub status_refresh_configured: bool,
    pub metrics: HealthMetricsView,
}
