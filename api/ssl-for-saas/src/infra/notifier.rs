use async_trait::async_trait;
use redis::AsyncCommands;
use redis::Client as RedisClient;
use std::fmt::Debug;
use thiserror::Error;
use tracing::{debug, info};

pub type NotifyResult<T> = Result<T, NotifyError>;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("publish to {channel} failed: {message}")]
    Publish { channel: String, message: String },
}

/// Pub/sub fan-out of serialized validation batches to DNS automation.
#[async_trait]
pub trait ValidationNotifier: Send + Sync + Debug {
    fn backend(&self) -> &'static str;

    async fn publish(&self, payload: &str, channel: &str) -> NotifyResult<()>;
}

#[derive(Debug, Clone)]
pub struct RedisValidationNotifier {
    client: RedisClient,
}

impl RedisValidationNotifier {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ValidationNotifier for RedisValidationNotifier {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn publish(&self, payload: &str, channel: &str) -> NotifyResult<()> {
        let fail = |message: String| NotifyError::Publish {
            channel: channel.to_string(),
            message,
        };
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| fail(format!("redis connect failed: {e}")))?;
        let receivers: i64 = conn
            .publish(channel, payload)
            .await
            .map_err(|e| fail(e.to_string()))?;
        debug!(channel = %channel, receivers, "validation batch published");
        Ok(())
    }
}

/// Used when no broker is configured; the batch still lands in the logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogValidationNotifier;

#[async_trait]
impl ValidationNotifier for LogValidationNotifier {
    fn backend(&self) -> &'static str {
        "log"
    }

    async fn publish(&self, payload: &str, channel: &str) -> NotifyResult<()> {
        info!(channel = %channel, payload = %payload, "validation batch ready");
        Ok(())
    }
}
