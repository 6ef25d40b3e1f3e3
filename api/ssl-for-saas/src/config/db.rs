use crate::config::environment::AppConfig;

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub key_prefix: String,
}

impl RedisConfig {
    pub fn from_app(app: &AppConfig) -> Option<Self> {
        app.redis_url.as_ref().map(|url| Self {
            url: url.clone(),
            key_prefix: app.job_key_prefix.clone(),
        })
    }
}
