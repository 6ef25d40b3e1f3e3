#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use http::{Request, StatusCode};
use rcgen::{CertificateParams, KeyPair};
use serde_json::Value;
use ssl_for_saas::app::{AppState, build_router};
use ssl_for_saas::config::environment::AppConfig;
use ssl_for_saas::infra::Collaborators;
use ssl_for_saas::infra::certificate_provider::{
    CertificateProvider, IssuedCertificate, JOB_TAG_KEY, LocalCertificateProvider, ProviderError,
    ProviderResult,
};
use ssl_for_saas::infra::job_store::MemoryJobStore;
use ssl_for_saas::infra::notifier::{NotifyError, NotifyResult, ValidationNotifier};
use ssl_for_saas::infra::status_refresh::{RefreshError, RefreshResult, StatusRefreshTrigger};
use ssl_for_saas::infra::workflow::{WorkflowDelegate, WorkflowResult};
use ssl_for_saas::module::ssl_job::schema::{
    CertificateSummary, CertificateTag, PemInput, ResolvedWorkflowRequest,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::util::ServiceExt;

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::local("test");
    config.job_reread_delay_ms = 10;
    config
}

/// Local authority that counts calls and can be told to fail the k-th
/// request or import.
#[derive(Debug, Default)]
pub struct RecordingProvider {
    inner: LocalCertificateProvider,
    fail_at: Option<usize>,
    fail_import_at: Option<usize>,
    requests: AtomicUsize,
    imports: AtomicUsize,
}

impl RecordingProvider {
    pub fn failing_at(k: usize) -> Self {
        Self {
            fail_at: Some(k),
            ..Self::default()
        }
    }

    pub fn failing_import_at(k: usize) -> Self {
        Self {
            fail_import_at: Some(k),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.load(Ordering::SeqCst) + self.imports.load(Ordering::SeqCst)
    }

    pub async fn tagged_with(&self, job_id: &str) -> Vec<CertificateSummary> {
        self.inner
            .list_certificates()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|c| c.tags.get(JOB_TAG_KEY).map(String::as_str) == Some(job_id))
            .collect()
    }
}

#[async_trait]
impl CertificateProvider for RecordingProvider {
    fn backend(&self) -> &'static str {
        "recording"
    }

    async fn request_certificate(
        &self,
        domain_name: &str,
        san_list: &[String],
    ) -> ProviderResult<IssuedCertificate> {
        let n = self.requests.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_at == Some(n) {
            return Err(ProviderError::Request {
                domain: domain_name.to_string(),
                message: "LimitExceededException".to_string(),
            });
        }
        self.inner.request_certificate(domain_name, san_list).await
    }

    async fn import_certificate(
        &self,
        bundle: &PemInput,
        tags: &[CertificateTag],
    ) -> ProviderResult<String> {
        let n = self.imports.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_import_at == Some(n) {
            return Err(ProviderError::Request {
                domain: "import".to_string(),
                message: "ValidationException".to_string(),
            });
        }
        self.inner.import_certificate(bundle, tags).await
    }

    async fn tag_certificate(&self, cert_arn: &str, job_id: &str) -> ProviderResult<()> {
        self.inner.tag_certificate(cert_arn, job_id).await
    }

    async fn list_certificates(&self) -> ProviderResult<Vec<CertificateSummary>> {
        self.inner.list_certificates().await
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub fail: bool,
    published: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// `(channel, payload)` pairs in publish order.
    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().expect("notifier lock").clone()
    }
}

#[async_trait]
impl ValidationNotifier for RecordingNotifier {
    fn backend(&self) -> &'static str {
        "recording"
    }

    async fn publish(&self, payload: &str, channel: &str) -> NotifyResult<()> {
        if self.fail {
            return Err(NotifyError::Publish {
                channel: channel.to_string(),
                message: "broker unavailable".to_string(),
            });
        }
        self.published
            .lock()
            .expect("notifier lock")
            .push((channel.to_string(), payload.to_string()));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingWorkflow {
    invocations: Mutex<Vec<(String, ResolvedWorkflowRequest)>>,
}

impl RecordingWorkflow {
    pub fn invocations(&self) -> Vec<(String, ResolvedWorkflowRequest)> {
        self.invocations.lock().expect("workflow lock").clone()
    }
}

#[async_trait]
impl WorkflowDelegate for RecordingWorkflow {
    async fn invoke(
        &self,
        workflow_id: &str,
        request: &ResolvedWorkflowRequest,
    ) -> WorkflowResult<String> {
        let mut invocations = self.invocations.lock().expect("workflow lock");
        invocations.push((workflow_id.to_string(), request.clone()));
        Ok(format!("exec-{}", invocations.len()))
    }
}

#[derive(Debug, Default)]
pub struct CountingRefresh {
    pub fail: bool,
    calls: AtomicUsize,
}

impl CountingRefresh {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The trigger runs on a spawned task; give it a moment to land.
    pub async fn wait_for_calls(&self, expected: usize) -> usize {
        for _ in 0..100 {
            if self.calls() >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.calls()
    }
}

#[async_trait]
impl StatusRefreshTrigger for CountingRefresh {
    async fn notify(&self, _job_id: &str) -> RefreshResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RefreshError::Rejected(503));
        }
        Ok(())
    }
}

pub struct Harness {
    pub app: Router,
    pub provider: Arc<RecordingProvider>,
    pub notifier: Arc<RecordingNotifier>,
    pub workflow: Arc<RecordingWorkflow>,
    pub refresh: Arc<CountingRefresh>,
}

pub fn harness() -> Harness {
    HarnessBuilder::default().build()
}

pub struct HarnessBuilder {
    pub config: AppConfig,
    pub provider: RecordingProvider,
    pub notifier: RecordingNotifier,
    pub with_workflow: bool,
    pub refresh: CountingRefresh,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            config: test_config(),
            provider: RecordingProvider::default(),
            notifier: RecordingNotifier::default(),
            with_workflow: true,
            refresh: CountingRefresh::default(),
        }
    }
}

impl HarnessBuilder {
    pub fn build(self) -> Harness {
        let provider = Arc::new(self.provider);
        let notifier = Arc::new(self.notifier);
        let workflow = Arc::new(RecordingWorkflow::default());
        let refresh = Arc::new(self.refresh);

        let collaborators = Collaborators {
            store: Arc::new(MemoryJobStore::default()),
            provider: provider.clone(),
            notifier: notifier.clone(),
            workflow: self
                .with_workflow
                .then(|| workflow.clone() as Arc<dyn WorkflowDelegate>),
            status_refresh: Some(refresh.clone() as Arc<dyn StatusRefreshTrigger>),
        };
        let app = build_router(AppState::with_collaborators(self.config, collaborators));

        Harness {
            app,
            provider,
            notifier,
            workflow,
            refresh,
        }
    }
}

/// Self-signed certificate covering `domains`, as `(cert_pem, key_pem)`.
pub fn self_signed_pem(domains: &[&str]) -> (String, String) {
    let key_pair = KeyPair::generate().expect("key pair");
    let params = CertificateParams::new(
        domains.iter().map(|d| d.to_string()).collect::<Vec<_>>(),
    )
    .expect("certificate params");
    let cert = params.self_signed(&key_pair).expect("self signed");
    (cert.pem(), key_pair.serialize_pem())
}

pub struct SubmitResponse {
    pub status: StatusCode,
    pub outcome: Option<String>,
    pub body: String,
}

impl SubmitResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("json error body")
    }
}

pub async fn submit(app: Router, body: &Value) -> SubmitResponse {
    let request = Request::builder()
        .method("POST")
        .uri("/ssl_for_saas")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).expect("serialize")))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let outcome = response
        .headers()
        .get("x-provision-outcome")
        .and_then(|v| v.to_str().ok())
        .map(ToOwned::to_owned);
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    SubmitResponse {
        status,
        outcome,
        body: String::from_utf8(bytes.to_vec()).expect("utf8"),
    }
}

pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = serde_json::from_slice::<Value>(&bytes).expect("json");
    (status, body)
}

pub async fn post_raw(
    app: Router,
    uri: &str,
    body: String,
    signature: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(sig) = signature {
        builder = builder.header("x-internal-signature", sig);
    }
    let request = builder.body(Body::from(body)).expect("request");
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = serde_json::from_slice::<Value>(&bytes).expect("json");
    (status, body)
}

pub async fn get_job(app: Router, job_id: &str) -> (StatusCode, Value) {
    get_json(app, &format!("/ssl_for_saas/get_ssl_job?job_id={job_id}")).await
}
