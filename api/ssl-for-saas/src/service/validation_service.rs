use crate::module::ssl_job::error::ProvisionError;
use crate::module::ssl_job::schema::{CnameInput, JobType, PemInput, SslForSaasRequest};
use serde_json::{Value, json};

/// A request whose shape has been checked; nothing has been written yet.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub job_type: JobType,
    pub auto_creation: String,
    pub cname_list: Vec<CnameInput>,
    pub pem_list: Vec<PemInput>,
}

impl ValidatedRequest {
    pub fn create_count(&self) -> u32 {
        let count = match self.job_type {
            JobType::Create => self.cname_list.len(),
            JobType::Import => self.pem_list.len(),
        };
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Request as kept on the job record. PEM material, private keys
    /// included, never leaves the request.
    pub fn job_input(&self) -> Value {
        json!({
            "acm_op": self.job_type.as_str(),
            "auto_creation": self.auto_creation,
            "cnameList": self.cname_list,
            "pemCount": self.pem_list.len(),
        })
    }
}

pub fn validate_ssl_request(req: &SslForSaasRequest) -> Result<ValidatedRequest, ProvisionError> {
    let acm_op = req
        .acm_op
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ProvisionError::InvalidRequest("acm_op is required".to_string()))?;
    let job_type = JobType::parse(acm_op).ok_or_else(|| {
        ProvisionError::InvalidRequest(format!("acm_op must be create or import, got {acm_op:?}"))
    })?;

    // Kept verbatim: only the exact strings "true" and "false" select a mode.
    let auto_creation = match &req.auto_creation {
        None | Some(Value::Null) => {
            return Err(ProvisionError::InvalidRequest(
                "auto_creation is required".to_string(),
            ));
        }
        Some(Value::String(flag)) if flag.trim().is_empty() => {
            return Err(ProvisionError::InvalidRequest(
                "auto_creation is required".to_string(),
            ));
        }
        Some(Value::String(flag)) => flag.clone(),
        Some(other) => return Err(ProvisionError::UnsupportedAutoCreation(other.to_string())),
    };

    let cname_list = req.cname_list.clone().unwrap_or_default();
    let pem_list = req.pem_list.clone().unwrap_or_default();

    match job_type {
        JobType::Create => {
            if cname_list.is_empty() {
                return Err(ProvisionError::InvalidRequest(
                    "cnameList must not be empty for create".to_string(),
                ));
            }
            if let Some(index) = cname_list
                .iter()
                .position(|c| c.domain_name.trim().is_empty())
            {
                return Err(ProvisionError::InvalidRequest(format!(
                    "cnameList[{index}].domainName is required"
                )));
            }
        }
        JobType::Import => {
            if pem_list.is_empty() {
                return Err(ProvisionError::InvalidRequest(
                    "pemList must not be empty for import".to_string(),
                ));
            }
            if let Some(index) = pem_list.iter().position(|p| {
                p.cert_pem.trim().is_empty() || p.private_key_pem.trim().is_empty()
            }) {
                return Err(ProvisionError::InvalidRequest(format!(
                    "pemList[{index}] requires CertPem and PrivateKeyPem"
                )));
            }
        }
    }

    Ok(ValidatedRequest {
        job_type,
        auto_creation,
        cname_list,
        pem_list,
    })
}
