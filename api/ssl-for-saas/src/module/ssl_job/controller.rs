use super::crud;
use super::error::AppError;
use super::model::{JobFieldUpdate, RequestContext};
use super::schema::{
    ErrorResponse, HealthMetricsView, HealthResponse, JobIdQuery, JobProgressResponse,
    SslForSaasRequest,
};
use crate::app::AppState;
use crate::service::internal_auth_service::{SIGNATURE_HEADER, verify_internal_signature};
use crate::service::metrics_service;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use tracing::{error, info};

pub const OUTCOME_HEADER: &str = "x-provision-outcome";

/// `200` carries the bare job id; the header says whether the job already
/// finished or was handed to the workflow engine.
pub async fn submit_ssl_job(
    State(state): State<AppState>,
    payload: Result<Json<SslForSaasRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            let err = AppError::bad_request("INVALID_REQUEST", rejection.body_text());
            return error_json(err, "ssl job body rejected").into_response();
        }
    };
    let ctx = RequestContext::new(Utc::now().timestamp());

    match crud::provision(&state, &ctx, &req).await {
        Ok(outcome) => {
            info!(job_id = %outcome.job_id(), outcome = outcome.as_str(), "ssl job accepted");
            (
                StatusCode::OK,
                [(OUTCOME_HEADER, outcome.as_str())],
                outcome.job_id().to_string(),
            )
                .into_response()
        }
        Err(err) => {
            let mut app_err = AppError::from(err);
            if app_err.status != StatusCode::BAD_REQUEST {
                app_err.status = StatusCode::INTERNAL_SERVER_ERROR;
            }
            error_json(app_err, "ssl job rejected").into_response()
        }
    }
}

pub async fn get_cert_list(State(state): State<AppState>) -> Response {
    match crud::list_certificates(&state).await {
        Ok(certs) => (StatusCode::OK, Json(certs)).into_response(),
        Err(err) => error_query(err.into(), "certificate listing failed").into_response(),
    }
}

pub async fn list_ssl_certification_with_job_id(
    State(state): State<AppState>,
    Query(query): Query<JobIdQuery>,
) -> Response {
    match crud::list_certificates_by_job(&state, &query.job_id).await {
        Ok(certs) => (StatusCode::OK, Json(certs)).into_response(),
        Err(err) => error_query(err.into(), "certificate listing by job failed").into_response(),
    }
}

pub async fn list_cloudfront_arn_with_job_id(
    State(state): State<AppState>,
    Query(query): Query<JobIdQuery>,
) -> Response {
    match crud::list_distribution_arns_by_job(&state, &query.job_id).await {
        Ok(arns) => (StatusCode::OK, Json(arns)).into_response(),
        Err(err) => error_query(err.into(), "distribution listing by job failed").into_response(),
    }
}

pub async fn list_ssl_jobs(State(state): State<AppState>) -> Response {
    match crud::list_jobs(&state).await {
        Ok(jobs) => (StatusCode::OK, Json(jobs)).into_response(),
        Err(err) => error_query(err.into(), "job listing failed").into_response(),
    }
}

pub async fn get_ssl_job(
    State(state): State<AppState>,
    Query(query): Query<JobIdQuery>,
) -> Response {
    match crud::get_job(&state, &query.job_id).await {
        Ok(job) => (StatusCode::OK, Json(job)).into_response(),
        Err(err) => {
            error!(job_id = %query.job_id, error_code = err.code(), error = %err, "job lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error_code: err.code().to_string(),
                    reason: format!("can not find job info with id: {}", query.job_id),
                }),
            )
                .into_response()
        }
    }
}

pub async fn update_job_progress(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
    Json(update): Json<JobFieldUpdate>,
) -> impl IntoResponse {
    if let Err(err) = verify_write_auth(&state, &headers, &update) {
        return error_progress(err);
    }

    match crud::apply_job_progress(&state, &job_id, &update).await {
        Ok(job) => (
            StatusCode::OK,
            Json(JobProgressResponse {
                updated: true,
                job: Some(job),
                error_code: None,
                reason: "job progress applied".to_string(),
            }),
        ),
        Err(err) => error_progress(err.into()),
    }
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let m = metrics_service::snapshot();
    let collaborators = &state.collaborators;

    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            store_backend: collaborators.store.backend().to_string(),
            provider_backend: collaborators.provider.backend().to_string(),
            notifier_backend: collaborators.notifier.backend().to_string(),
            workflow_configured: collaborators.workflow.is_some(),
            status_refresh_configured: collaborators.status_refresh.is_some(),
            metrics: HealthMetricsView {
                jobs_created: m.jobs_created,
                jobs_completed: m.jobs_completed,
                jobs_delegated: m.jobs_delegated,
                jobs_failed: m.jobs_failed,
                certificates_requested: m.certificates_requested,
                certificates_imported: m.certificates_imported,
                refresh_failures: m.refresh_failures,
                last_error_ts: m.last_error_ts,
            },
        }),
    )
}

fn verify_write_auth<T: serde::Serialize>(
    state: &AppState,
    headers: &HeaderMap,
    payload: &T,
) -> Result<(), AppError> {
    if !state.config.internal_auth_enabled {
        return Ok(());
    }
    let secret = state
        .config
        .internal_auth_secret
        .as_deref()
        .ok_or_else(|| AppError::internal("AUTH_CONFIG_ERROR", "internal auth secret missing"))?;
    let sig = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            AppError::unauthorized("AUTH_MISSING_SIGNATURE", "missing x-internal-signature")
        })?;
    let canonical = serde_json::to_string(payload).map_err(|e| {
        AppError::internal(
            "AUTH_SERIALIZE_ERROR",
            format!("auth payload serialization failed: {e}"),
        )
    })?;
    verify_internal_signature(&canonical, sig, secret)
        .map_err(|e| AppError::unauthorized("AUTH_INVALID_SIGNATURE", e))
}

fn error_json(err: AppError, context: &'static str) -> (StatusCode, Json<ErrorResponse>) {
    error!(error_code = err.code, reason = %err.message, "{context}");
    (
        err.status,
        Json(ErrorResponse {
            error_code: err.code.to_string(),
            reason: err.message,
        }),
    )
}

fn error_query(mut err: AppError, context: &'static str) -> (StatusCode, Json<ErrorResponse>) {
    err.status = StatusCode::INTERNAL_SERVER_ERROR;
    error_json(err, context)
}

fn error_progress(err: AppError) -> (StatusCode, Json<JobProgressResponse>) {
    error!(error_code = err.code, reason = %err.message, "job progress rejected");
    (
        err.status,
        Json(JobProgressResponse {
            updated: false,
            job: None,
            error_code: Some(err.code.to_string()),
            reason: err.message,
        }),
    )
}
