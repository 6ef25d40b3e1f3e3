use super::controller;
use crate::app::AppState;
use axum::Router;
use axum::routing::{get, post};

pub fn register_routes(state: AppState) -> Router {
    Router::new()
        .route("/ssl_for_saas", post(controller::submit_ssl_job))
        .route("/ssl_for_saas/health", get(controller::health))
        .route("/ssl_for_saas/cert_list", get(controller::get_cert_list))
        .route(
            "/ssl_for_saas/list_ssl_certification_with_jobId",
            get(controller::list_ssl_certification_with_job_id),
        )
        .route(
            "/ssl_for_saas/list_cloudfront_arn_with_jobId",
            get(controller::list_cloudfront_arn_with_job_id),
        )
        .route("/ssl_for_saas/list_ssl_jobs", get(controller::list_ssl_jobs))
        .route("/ssl_for_saas/get_ssl_job", get(controller::get_ssl_job))
        .route(
            "/ssl_for_saas/ssl_job/:job_id/progress",
            post(controller::update_job_progress),
        )
        .with_state(state)
}
