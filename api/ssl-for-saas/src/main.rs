use ssl_for_saas::app::{AppState, build_router};
use ssl_for_saas::config::environment::AppConfig;
use ssl_for_saas::infra::init_infra;
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    init_logging();

    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "config error");
            std::process::exit(1);
        }
    };

    let bind_addr = format!("{}:{}", config.api_host, config.api_port);
    let listener = match TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(error = %e, bind_addr = %bind_addr, "server bind error");
            std::process::exit(1);
        }
    };

    let infra = match init_infra(&config).await {
        Ok(i) => i,
        Err(e) => {
            error!(error = %e, "infra init error");
            std::process::exit(1);
        }
    };
    let state = AppState::new(config, &infra);

    info!(
        env = %state.config.rust_env,
        host = %state.config.api_host,
        port = state.config.api_port,
        store = state.collaborators.store.backend(),
        provider = state.collaborators.provider.backend(),
        notifier = state.collaborators.notifier.backend(),
        workflow_configured = state.collaborators.workflow.is_some(),
        status_refresh_configured = state.collaborators.status_refresh.is_some(),
        "ssl-for-saas started"
    );

    let app = build_router(state);
    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "server runtime error");
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
