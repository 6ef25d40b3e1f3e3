use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub rust_env: String,
    pub api_host: String,
    pub api_port: u16,
    pub redis_url: Option<String>,
    pub job_key_prefix: String,
    pub validation_channel: String,
    pub cert_authority_base_url: Option<String>,
    pub workflow_base_url: Option<String>,
    pub workflow_id: String,
    pub status_refresh_url: Option<String>,
    pub job_reread_delay_ms: u64,
    pub http_timeout_seconds: u64,
    pub internal_auth_enabled: bool,
    pub internal_auth_secret: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        load_dotenv_layers();
        Ok(Self {
            rust_env: read_var("RUST_ENV")?,
            api_host: read_var("API_HOST")?,
            api_port: read_var("API_PORT")?
                .parse::<u16>()
                .map_err(|e| format!("invalid API_PORT: {e}"))?,
            redis_url: read_optional_url("REDIS_URL"),
            job_key_prefix: read_optional_string("JOB_KEY_PREFIX", "ssl_jobs"),
            validation_channel: read_optional_string("VALIDATION_CHANNEL", "ssl_for_saas:dcv"),
            cert_authority_base_url: read_optional_url("CERT_AUTHORITY_BASE_URL"),
            workflow_base_url: read_optional_url("WORKFLOW_BASE_URL"),
            workflow_id: read_optional_string("WORKFLOW_ID", "ssl-for-saas"),
            status_refresh_url: read_optional_url("STATUS_REFRESH_URL"),
            job_reread_delay_ms: read_optional_u64("JOB_REREAD_DELAY_MS", 3000)?,
            http_timeout_seconds: read_optional_u64("HTTP_TIMEOUT_SECONDS", 10)?,
            internal_auth_enabled: read_optional_bool("INTERNAL_AUTH_ENABLED", false),
            internal_auth_secret: env::var("INTERNAL_AUTH_SECRET").ok(),
        })
    }

    /// Configuration for running without any external collaborator.
    pub fn local(rust_env: &str) -> Self {
        Self {
            rust_env: rust_env.to_string(),
            api_host: "127.0.0.1".to_string(),
            api_port: 0,
            redis_url: None,
            job_key_prefix: "ssl_jobs".to_string(),
            validation_channel: "ssl_for_saas:dcv".to_string(),
            cert_authority_base_url: None,
            workflow_base_url: None,
            workflow_id: "ssl-for-saas".to_string(),
            status_refresh_url: None,
            job_reread_delay_ms: 3000,
            http_timeout_seconds: 10,
            internal_auth_enabled: false,
            internal_auth_secret: None,
        }
    }
}

fn read_var(key: &str) -> Result<String, String> {
    env::var(key).map_err(|_| format!("missing required env var: {key}"))
}

fn read_optional_u64(key: &str, default: u64) -> Result<u64, String> {
    match env::var(key) {
        Ok(v) => v.parse::<u64>().map_err(|e| format!("invalid {key}: {e}")),
        Err(_) => Ok(default),
    }
}

fn read_optional_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"),
        Err(_) => default,
    }
}

fn read_optional_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn read_optional_url(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
}

fn load_dotenv_layers() {
    for path in [".env", "../.env", "../../.env"] {
        let _ = dotenvy::from_path_override(path);
    }
}
