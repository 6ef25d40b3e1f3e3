pub mod certificate_provider;
pub mod job_store;
pub mod notifier;
pub mod status_refresh;
pub mod workflow;

use crate::config::db::RedisConfig;
use crate::config::environment::AppConfig;
use certificate_provider::{CertificateProvider, HttpCertificateProvider, LocalCertificateProvider};
use job_store::{JobStore, MemoryJobStore, RedisJobStore};
use notifier::{LogValidationNotifier, RedisValidationNotifier, ValidationNotifier};
use redis::Client as RedisClient;
use status_refresh::{HttpStatusRefreshTrigger, StatusRefreshTrigger};
use std::sync::Arc;
use std::time::Duration;
use workflow::{HttpWorkflowDelegate, WorkflowDelegate};

/// Process-wide client handles, opened once at startup.
#[derive(Debug, Clone)]
pub struct InfraClients {
    pub redis: Option<(RedisClient, RedisConfig)>,
    pub http: reqwest::Client,
}

pub async fn init_infra(config: &AppConfig) -> Result<InfraClients, String> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_seconds.max(1)))
        .build()
        .map_err(|e| format!("http client init failed: {e}"))?;

    let redis = match RedisConfig::from_app(config) {
        Some(redis_config) => {
            let client = RedisClient::open(redis_config.url.clone())
                .map_err(|e| format!("redis init failed: {e}"))?;
            Some((client, redis_config))
        }
        None => None,
    };

    Ok(InfraClients { redis, http })
}

/// The narrow interfaces the orchestrator talks to.
#[derive(Debug, Clone)]
pub struct Collaborators {
    pub store: Arc<dyn JobStore>,
    pub provider: Arc<dyn CertificateProvider>,
    pub notifier: Arc<dyn ValidationNotifier>,
    pub workflow: Option<Arc<dyn WorkflowDelegate>>,
    pub status_refresh: Option<Arc<dyn StatusRefreshTrigger>>,
}

impl Collaborators {
    /// In-process backends only: memory store, local authority, log notifier.
    pub fn local() -> Self {
        Self {
            store: Arc::new(MemoryJobStore::default()),
            provider: Arc::new(LocalCertificateProvider::default()),
            notifier: Arc::new(LogValidationNotifier),
            workflow: None,
            status_refresh: None,
        }
    }

    /// Swaps in a remote backend for every collaborator the config names.
    pub fn from_infra(config: &AppConfig, infra: &InfraClients) -> Self {
        let mut collaborators = Self::local();

        if let Some((client, redis_config)) = &infra.redis {
            collaborators.store = Arc::new(RedisJobStore::new(
                client.clone(),
                redis_config.key_prefix.clone(),
            ));
            collaborators.notifier = Arc::new(RedisValidationNotifier::new(client.clone()));
        }
        if let Some(base_url) = &config.cert_authority_base_url {
            collaborators.provider = Arc::new(HttpCertificateProvider::new(
                infra.http.clone(),
                base_url.clone(),
            ));
        }
        if let Some(base_url) = &config.workflow_base_url {
            collaborators.workflow = Some(Arc::new(HttpWorkflowDelegate::new(
                infra.http.clone(),
                base_url.clone(),
            )));
        }
        if let Some(url) = &config.status_refresh_url {
            collaborators.status_refresh = Some(Arc::new(HttpStatusRefreshTrigger::new(
                infra.http.clone(),
                url.clone(),
            )));
        }

        collaborators
    }
}
