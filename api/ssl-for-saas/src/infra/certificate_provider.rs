//! Certificate authority access.
//!
//! The orchestrator only sees [`CertificateProvider`]; which authority sits
//! behind it is a deployment choice.

use crate::module::ssl_job::schema::{
    CertificateSummary, CertificateTag, DomainValidationOption, PemInput, ResourceRecord,
    ValidationMethod,
};
use crate::service::pem_service::domain_list_from_pem;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Debug;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Tag key linking a certificate back to the job that produced it.
pub const JOB_TAG_KEY: &str = "job_token";
pub const ISSUER_TAG_KEY: &str = "issuer";

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("certificate request for {domain} failed: {message}")]
    Request { domain: String, message: String },

    #[error("certificate import failed: {0}")]
    Import(String),

    #[error("tagging certificate {cert_arn} failed: {message}")]
    Tag { cert_arn: String, message: String },

    #[error("certificate listing failed: {0}")]
    List(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssuedCertificate {
    pub cert_arn: String,
    #[serde(default)]
    pub validation_options: Vec<DomainValidationOption>,
}

#[async_trait]
pub trait CertificateProvider: Send + Sync + Debug {
    fn backend(&self) -> &'static str;

    /// Requests a new certificate and returns its validation challenges.
    async fn request_certificate(
        &self,
        domain_name: &str,
        san_list: &[String],
    ) -> ProviderResult<IssuedCertificate>;

    /// Imports an existing bundle and returns the new certificate handle.
    async fn import_certificate(
        &self,
        bundle: &PemInput,
        tags: &[CertificateTag],
    ) -> ProviderResult<String>;

    async fn tag_certificate(&self, cert_arn: &str, job_id: &str) -> ProviderResult<()>;

    async fn list_certificates(&self) -> ProviderResult<Vec<CertificateSummary>>;
}

/// In-process authority for development and tests. Issues DNS CNAME
/// challenges derived from the certificate handle so they are stable per
/// certificate.
#[derive(Debug, Default)]
pub struct LocalCertificateProvider {
    certificates: Mutex<Vec<CertificateSummary>>,
}

impl LocalCertificateProvider {
    fn lock(&self) -> MutexGuard<'_, Vec<CertificateSummary>> {
        self.certificates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CertificateProvider for LocalCertificateProvider {
    fn backend(&self) -> &'static str {
        "local"
    }

    async fn request_certificate(
        &self,
        domain_name: &str,
        san_list: &[String],
    ) -> ProviderResult<IssuedCertificate> {
        if domain_name.trim().is_empty() {
            return Err(ProviderError::Request {
                domain: domain_name.to_string(),
                message: "domain name is empty".to_string(),
            });
        }
        let cert_arn = format!("arn:local:acm:certificate/{}", Uuid::new_v4());

        let mut covered = vec![domain_name.to_string()];
        for san in san_list {
            if !covered.contains(san) {
                covered.push(san.clone());
            }
        }
        let validation_options = covered
            .iter()
            .map(|domain| DomainValidationOption {
                domain_name: domain.clone(),
                validation_method: ValidationMethod::Dns,
                resource_record: Some(local_challenge_record(&cert_arn, domain)),
            })
            .collect::<Vec<_>>();

        self.lock().push(CertificateSummary {
            cert_arn: cert_arn.clone(),
            domain_name: domain_name.to_string(),
            san_list: covered,
            status: "PENDING_VALIDATION".to_string(),
            tags: Default::default(),
        });
        debug!(cert_arn = %cert_arn, domain = %domain_name, "local certificate requested");

        Ok(IssuedCertificate {
            cert_arn,
            validation_options,
        })
    }

    async fn import_certificate(
        &self,
        bundle: &PemInput,
        tags: &[CertificateTag],
    ) -> ProviderResult<String> {
        let domains = domain_list_from_pem(&bundle.cert_pem)
            .map_err(|e| ProviderError::Import(e.to_string()))?;
        if bundle.private_key_pem.trim().is_empty() {
            return Err(ProviderError::Import("private key is empty".to_string()));
        }
        let cert_arn = format!("arn:local:acm:certificate/{}", Uuid::new_v4());
        self.lock().push(CertificateSummary {
            cert_arn: cert_arn.clone(),
            domain_name: domains.first().cloned().unwrap_or_default(),
            san_list: domains,
            status: "ISSUED".to_string(),
            tags: tags
                .iter()
                .map(|t| (t.key.clone(), t.value.clone()))
                .collect(),
        });
        Ok(cert_arn)
    }

    async fn tag_certificate(&self, cert_arn: &str, job_id: &str) -> ProviderResult<()> {
        let mut certificates = self.lock();
        let cert = certificates
            .iter_mut()
            .find(|c| c.cert_arn == cert_arn)
            .ok_or_else(|| ProviderError::Tag {
                cert_arn: cert_arn.to_string(),
                message: "certificate not found".to_string(),
            })?;
        cert.tags
            .insert(JOB_TAG_KEY.to_string(), job_id.to_string());
        Ok(())
    }

    async fn list_certificates(&self) -> ProviderResult<Vec<CertificateSummary>> {
        Ok(self.lock().clone())
    }
}

fn local_challenge_record(cert_arn: &str, domain: &str) -> ResourceRecord {
    let name_token = hex::encode(Sha256::digest(format!("{cert_arn}:{domain}").as_bytes()));
    let value_token = hex::encode(Sha256::digest(format!("{domain}:{cert_arn}").as_bytes()));
    let base = domain.strip_prefix("*.").unwrap_or(domain);
    ResourceRecord {
        name: format!("_{}.{base}.", &name_token[..32]),
        record_type: "CNAME".to_string(),
        value: format!("_{}.acm-validations.local.", &value_token[..32]),
    }
}

/// Certificate gateway spoken to over JSON.
///
/// ```text
/// POST {base}/certificates         {domain_name, subject_alternative_names}
///                                  -> {cert_arn, validation_options}
/// POST {base}/certificates/import  {certificate, certificate_chain, private_key, tags}
///                                  -> {cert_arn}
/// POST {base}/certificates/tags    {cert_arn, tags}
/// GET  {base}/certificates         -> {certificates: [...]}
/// ```
#[derive(Debug, Clone)]
pub struct HttpCertificateProvider {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct RequestCertificateBody<'a> {
    domain_name: &'a str,
    subject_alternative_names: &'a [String],
}

#[derive(Debug, Serialize)]
struct ImportCertificateBody<'a> {
    certificate: &'a str,
    certificate_chain: &'a str,
    private_key: &'a str,
    tags: &'a [CertificateTag],
}

#[derive(Debug, Serialize)]
struct TagCertificateBody<'a> {
    cert_arn: &'a str,
    tags: Vec<CertificateTag>,
}

#[derive(Debug, Deserialize)]
struct ImportCertificateReply {
    cert_arn: String,
}

#[derive(Debug, Deserialize)]
struct ListCertificatesReply {
    #[serde(default)]
    certificates: Vec<CertificateSummary>,
}

impl HttpCertificateProvider {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl CertificateProvider for HttpCertificateProvider {
    fn backend(&self) -> &'static str {
        "http"
    }

    async fn request_certificate(
        &self,
        domain_name: &str,
        san_list: &[String],
    ) -> ProviderResult<IssuedCertificate> {
        let fail = |message: String| ProviderError::Request {
            domain: domain_name.to_string(),
            message,
        };
        let response = self
            .client
            .post(self.url("/certificates"))
            .json(&RequestCertificateBody {
                domain_name,
                subject_alternative_names: san_list,
            })
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("status={}", status.as_u16())));
        }
        response
            .json::<IssuedCertificate>()
            .await
            .map_err(|e| fail(format!("decode failed: {e}")))
    }

    async fn import_certificate(
        &self,
        bundle: &PemInput,
        tags: &[CertificateTag],
    ) -> ProviderResult<String> {
        let response = self
            .client
            .post(self.url("/certificates/import"))
            .json(&ImportCertificateBody {
                certificate: &bundle.cert_pem,
                certificate_chain: &bundle.chain_pem,
                private_key: &bundle.private_key_pem,
                tags,
            })
            .send()
            .await
            .map_err(|e| ProviderError::Import(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Import(format!("status={}", status.as_u16())));
        }
        let reply = response
            .json::<ImportCertificateReply>()
            .await
            .map_err(|e| ProviderError::Import(format!("decode failed: {e}")))?;
        Ok(reply.cert_arn)
    }

    async fn tag_certificate(&self, cert_arn: &str, job_id: &str) -> ProviderResult<()> {
        let fail = |message: String| ProviderError::Tag {
            cert_arn: cert_arn.to_string(),
            message,
        };
        let response = self
            .client
            .post(self.url("/certificates/tags"))
            .json(&TagCertificateBody {
                cert_arn,
                tags: vec![CertificateTag {
                    key: JOB_TAG_KEY.to_string(),
                    value: job_id.to_string(),
                }],
            })
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("status={}", status.as_u16())));
        }
        Ok(())
    }

    async fn list_certificates(&self) -> ProviderResult<Vec<CertificateSummary>> {
        let response = self
            .client
            .get(self.url("/certificates"))
            .send()
            .await
            .map_err(|e| ProviderError::List(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::List(format!("status={}", status.as_u16())));
        }
        let reply = response
            .json::<ListCertificatesReply>()
            .await
            .map_err(|e| ProviderError::List(format!("decode failed: {e}")))?;
        Ok(reply.certificates)
    }
}
