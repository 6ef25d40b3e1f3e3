use crate::config::environment::AppConfig;
use crate::infra::{Collaborators, InfraClients};
use crate::module::ssl_job::route::register_routes;
use axum::Router;
use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub collaborators: Collaborators,
}

impl AppState {
    /// Collaborators that are not configured run in-process; configured ones
    /// always use the clients in `infra`.
    pub fn new(config: AppConfig, infra: &InfraClients) -> Self {
        let collaborators = Collaborators::from_infra(&config, infra);
        Self::with_collaborators(config, collaborators)
    }

    pub fn with_collaborators(config: AppConfig, collaborators: Collaborators) -> Self {
        Self {
            config,
            collaborators,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    register_routes(state).layer(cors)
}
