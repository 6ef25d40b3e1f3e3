use super::error::ProvisionError;
use super::model::{CertEntry, JobFieldUpdate, ProvisionOutcome, RequestContext, SslJobRecord};
use super::schema::{
    CertificateSummary, CertificateTag, CnameInput, JobType, PemInput, ResolvedWorkflowRequest,
    SslForSaasRequest, StageStatus,
};
use crate::app::AppState;
use crate::infra::certificate_provider::{ISSUER_TAG_KEY, JOB_TAG_KEY};
use crate::infra::status_refresh::spawn_refresh;
use crate::infra::workflow::WorkflowError;
use crate::service::dns_validation_service::{ValidationBatch, publish_batch};
use crate::service::metrics_service;
use crate::service::pem_service::{canonical_domain, domain_list_from_pem};
use crate::service::validation_service::{ValidatedRequest, validate_ssl_request};
use chrono::Utc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProvisionMode {
    Synchronous,
    Delegated,
}

impl ProvisionMode {
    fn from_flag(auto_creation: &str) -> Result<Self, ProvisionError> {
        match auto_creation {
            "false" => Ok(Self::Synchronous),
            "true" => Ok(Self::Delegated),
            other => Err(ProvisionError::UnsupportedAutoCreation(other.to_string())),
        }
    }
}

/// Accepts one provisioning request. Nothing is written until the request
/// validates and its mode is known; after the job exists, any failure is
/// recorded on it before the error is returned.
pub async fn provision(
    state: &AppState,
    ctx: &RequestContext,
    req: &SslForSaasRequest,
) -> Result<ProvisionOutcome, ProvisionError> {
    let validated = validate_ssl_request(req)?;
    let mode = ProvisionMode::from_flag(&validated.auto_creation)?;

    let job = SslJobRecord::new(
        ctx.job_id.clone(),
        validated.job_type,
        validated.job_input(),
        validated.create_count(),
        mode == ProvisionMode::Delegated,
        ctx.received_at,
    );
    state.collaborators.store.create_job(&job).await?;
    metrics_service::inc_jobs_created();
    info!(
        job_id = %ctx.job_id,
        job_type = %validated.job_type.as_str(),
        create_count = job.create_count,
        dist_stage = %job.dist_stage_status,
        "ssl job created"
    );

    let result = match mode {
        ProvisionMode::Synchronous => run_synchronous(state, ctx, &validated)
            .await
            .map(|()| ProvisionOutcome::Completed(ctx.job_id.clone())),
        ProvisionMode::Delegated => delegate(state, ctx, &validated)
            .await
            .map(|()| ProvisionOutcome::Delegated(ctx.job_id.clone())),
    };

    match result {
        Ok(outcome) => {
            match &outcome {
                ProvisionOutcome::Completed(_) => metrics_service::inc_jobs_completed(),
                ProvisionOutcome::Delegated(_) => metrics_service::inc_jobs_delegated(),
            }
            Ok(outcome)
        }
        Err(err) => {
            record_failure(state, &ctx.job_id, &err).await;
            Err(err)
        }
    }
}

async fn run_synchronous(
    state: &AppState,
    ctx: &RequestContext,
    validated: &ValidatedRequest,
) -> Result<(), ProvisionError> {
    match validated.job_type {
        JobType::Create => run_create_branch(state, ctx, &validated.cname_list).await,
        JobType::Import => run_import_branch(state, ctx, &validated.pem_list).await,
    }
}

async fn run_create_branch(
    state: &AppState,
    ctx: &RequestContext,
    cnames: &[CnameInput],
) -> Result<(), ProvisionError> {
    let provider = &state.collaborators.provider;
    let mut batch = ValidationBatch::default();
    let mut certs = Vec::with_capacity(cnames.len());

    for (index, cname) in cnames.iter().enumerate() {
        let issued = provider
            .request_certificate(&cname.domain_name, &cname.san_list)
            .await?;
        metrics_service::inc_certificates_requested();
        provider.tag_certificate(&issued.cert_arn, &ctx.job_id).await?;

        let challenges = batch.collect(&issued.validation_options);
        info!(
            job_id = %ctx.job_id,
            index,
            domain = %cname.domain_name,
            cert_arn = %issued.cert_arn,
            challenges,
            "certificate requested"
        );
        certs.push(CertEntry {
            cert_arn: issued.cert_arn,
            domain_name: cname.domain_name.clone(),
            san_list: cname.san_list.clone(),
        });
    }

    if batch.is_empty() {
        warn!(job_id = %ctx.job_id, "authority returned no DNS challenges");
    }

    // Publish first; cert SUCCESS is final once written.
    let payload = publish_batch(
        state.collaborators.notifier.as_ref(),
        &state.config.validation_channel,
        &batch,
    )
    .await?;
    debug!(job_id = %ctx.job_id, records = batch.len(), "validation batch published");

    let completed = u32::try_from(certs.len()).unwrap_or(u32::MAX);
    state
        .collaborators
        .store
        .update_job_fields(
            &ctx.job_id,
            &JobFieldUpdate {
                cert_stage_status: Some(StageStatus::Success),
                validation_stage_status: Some(StageStatus::InProgress),
                completed_cert_count: Some(completed),
                validation_message: Some(payload),
                append_certs: certs,
                ..JobFieldUpdate::default()
            },
        )
        .await?;
    Ok(())
}

async fn run_import_branch(
    state: &AppState,
    ctx: &RequestContext,
    bundles: &[PemInput],
) -> Result<(), ProvisionError> {
    let provider = &state.collaborators.provider;
    let mut certs = Vec::with_capacity(bundles.len());

    for (index, bundle) in bundles.iter().enumerate() {
        let domains = read_bundle_domains(index, bundle)?;
        let issuer = canonical_domain(&domains);
        if issuer.is_empty() {
            warn!(job_id = %ctx.job_id, index, "certificate names no domain; issuer tag left empty");
        }

        let cert_arn = provider
            .import_certificate(
                bundle,
                &[CertificateTag {
                    key: ISSUER_TAG_KEY.to_string(),
                    value: issuer.clone(),
                }],
            )
            .await?;
        metrics_service::inc_certificates_imported();
        provider.tag_certificate(&cert_arn, &ctx.job_id).await?;
        info!(job_id = %ctx.job_id, index, issuer = %issuer, cert_arn = %cert_arn, "certificate imported");

        certs.push(CertEntry {
            cert_arn,
            domain_name: issuer,
            san_list: domains,
        });
    }

    let completed = u32::try_from(certs.len()).unwrap_or(u32::MAX);
    state
        .collaborators
        .store
        .update_job_fields(
            &ctx.job_id,
            &JobFieldUpdate {
                cert_stage_status: Some(StageStatus::Success),
                validation_stage_status: Some(StageStatus::Success),
                completed_cert_count: Some(completed),
                append_certs: certs,
                ..JobFieldUpdate::default()
            },
        )
        .await?;
    Ok(())
}

async fn delegate(
    state: &AppState,
    ctx: &RequestContext,
    validated: &ValidatedRequest,
) -> Result<(), ProvisionError> {
    let workflow = state
        .collaborators
        .workflow
        .as_ref()
        .ok_or(WorkflowError::NotConfigured)?;

    let cname_list = match validated.job_type {
        JobType::Create => validated.cname_list.clone(),
        JobType::Import => resolve_import_bundles(&validated.pem_list)?,
    };
    let request = ResolvedWorkflowRequest {
        job_id: ctx.job_id.clone(),
        acm_op: validated.job_type,
        auto_creation: validated.auto_creation.clone(),
        cname_list,
        pem_list: validated.pem_list.clone(),
    };

    let execution_id = workflow
        .invoke(&state.config.workflow_id, &request)
        .await?;
    info!(
        job_id = %ctx.job_id,
        workflow_id = %state.config.workflow_id,
        execution_id = %execution_id,
        "provisioning handed to workflow engine"
    );
    Ok(())
}

/// Turns each import bundle into the domain request the workflow engine
/// expects: the first recovered domain as-is, every recovered domain as a SAN.
pub fn resolve_import_bundles(bundles: &[PemInput]) -> Result<Vec<CnameInput>, ProvisionError> {
    bundles
        .iter()
        .enumerate()
        .map(|(index, bundle)| {
            let domains = read_bundle_domains(index, bundle)?;
            Ok(CnameInput {
                domain_name: domains.first().cloned().unwrap_or_default(),
                san_list: domains,
                existing_cf_info: bundle.existing_cf_info.clone(),
                origins_items_domain_name: None,
            })
        })
        .collect()
}

fn read_bundle_domains(index: usize, bundle: &PemInput) -> Result<Vec<String>, ProvisionError> {
    domain_list_from_pem(&bundle.cert_pem)
        .map_err(|e| ProvisionError::InvalidCertificate(format!("pemList[{index}]: {e}")))
}

async fn record_failure(state: &AppState, job_id: &str, err: &ProvisionError) {
    metrics_service::inc_jobs_failed(Utc::now().timestamp());
    error!(job_id = %job_id, error_code = err.code(), error = %err, "ssl job failed");

    if let Err(write_err) = state
        .collaborators
        .store
        .update_job_fields(job_id, &JobFieldUpdate::failed(err.to_string()))
        .await
    {
        error!(job_id = %job_id, error = %write_err, "could not record job failure");
    }
}

pub async fn list_certificates(state: &AppState) -> Result<Vec<CertificateSummary>, ProvisionError> {
    Ok(state.collaborators.provider.list_certificates().await?)
}

pub async fn list_certificates_by_job(
    state: &AppState,
    job_id: &str,
) -> Result<Vec<CertificateSummary>, ProvisionError> {
    let certificates = state.collaborators.provider.list_certificates().await?;
    Ok(certificates
        .into_iter()
        .filter(|c| c.tags.get(JOB_TAG_KEY).map(String::as_str) == Some(job_id))
        .collect())
}

/// Distribution ARNs recorded on the job; an unknown job has none.
pub async fn list_distribution_arns_by_job(
    state: &AppState,
    job_id: &str,
) -> Result<Vec<String>, ProvisionError> {
    let job = state.collaborators.store.get_job(job_id).await?;
    Ok(job
        .map(|j| {
            j.dist_list
                .into_iter()
                .map(|d| d.distribution_arn)
                .collect()
        })
        .unwrap_or_default())
}

pub async fn list_jobs(state: &AppState) -> Result<Vec<SslJobRecord>, ProvisionError> {
    Ok(state.collaborators.store.list_jobs().await?)
}

/// Nudges the reconciler, then reads the job. An empty id gets one delayed
/// re-read before giving up.
pub async fn get_job(state: &AppState, job_id: &str) -> Result<SslJobRecord, ProvisionError> {
    spawn_refresh(state.collaborators.status_refresh.clone(), job_id);

    let store = &state.collaborators.store;
    let mut job = store.get_job(job_id).await?;
    if job_id.trim().is_empty() {
        debug!(delay_ms = state.config.job_reread_delay_ms, "empty job id; re-reading after delay");
        sleep(Duration::from_millis(state.config.job_reread_delay_ms)).await;
        job = store.get_job(job_id).await?;
    }
    job.ok_or_else(|| ProvisionError::JobNotFound(job_id.to_string()))
}

pub async fn apply_job_progress(
    state: &AppState,
    job_id: &str,
    update: &JobFieldUpdate,
) -> Result<SslJobRecord, ProvisionError> {
    let job = state
        .collaborators
        .store
        .update_job_fields(job_id, update)
        .await?;
    info!(
        job_id = %job_id,
        cert_stage = %job.cert_stage_status,
        validation_stage = %job.validation_stage_status,
        dist_stage = %job.dist_stage_status,
        "job progress applied"
    );
    Ok(job)
}
