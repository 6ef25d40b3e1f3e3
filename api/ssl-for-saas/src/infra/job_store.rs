//! Durable job records, addressed by job id.
//!
//! Every backend funnels writes through [`SslJobRecord::apply`], so the stage
//! invariants hold no matter who writes: the orchestrator, or the workflow
//! engine reporting progress on a delegated job.

use crate::module::ssl_job::model::{JobFieldUpdate, SslJobRecord, TransitionError};
use async_trait::async_trait;
use chrono::Utc;
use redis::AsyncCommands;
use redis::Client as RedisClient;
use redis::aio::MultiplexedConnection;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job {0} already exists")]
    DuplicateJob(String),

    #[error("job {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("job store lock poisoned")]
    LockPoisoned,

    #[error("job {0} is being written by another caller")]
    Busy(String),

    #[error("job store backend error: {0}")]
    Backend(String),

    #[error("job record decode failed: {0}")]
    Decode(String),
}

#[async_trait]
pub trait JobStore: Send + Sync + Debug {
    fn backend(&self) -> &'static str;

    /// Inserts a new job; an existing id is never overwritten.
    async fn create_job(&self, job: &SslJobRecord) -> StoreResult<()>;

    /// Applies a partial update atomically and returns the stored result.
    async fn update_job_fields(
        &self,
        job_id: &str,
        update: &JobFieldUpdate,
    ) -> StoreResult<SslJobRecord>;

    async fn get_job(&self, job_id: &str) -> StoreResult<Option<SslJobRecord>>;

    /// All jobs, newest first.
    async fn list_jobs(&self) -> StoreResult<Vec<SslJobRecord>>;
}

#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs_by_id: Mutex<HashMap<String, SslJobRecord>>,
}

impl MemoryJobStore {
    fn lock(&self) -> StoreResult<MutexGuard<'_, HashMap<String, SslJobRecord>>> {
        self.jobs_by_id.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn create_job(&self, job: &SslJobRecord) -> StoreResult<()> {
        let mut jobs = self.lock()?;
        if jobs.contains_key(&job.job_id) {
            return Err(StoreError::DuplicateJob(job.job_id.clone()));
        }
        jobs.insert(job.job_id.clone(), job.clone());
        Ok(())
    }

    async fn update_job_fields(
        &self,
        job_id: &str,
        update: &JobFieldUpdate,
    ) -> StoreResult<SslJobRecord> {
        let mut jobs = self.lock()?;
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| StoreError::NotFound(job_id.to_string()))?;
        job.apply(update, Utc::now().timestamp())?;
        Ok(job.clone())
    }

    async fn get_job(&self, job_id: &str) -> StoreResult<Option<SslJobRecord>> {
        Ok(self.lock()?.get(job_id).cloned())
    }

    async fn list_jobs(&self) -> StoreResult<Vec<SslJobRecord>> {
        let mut jobs = self.lock()?.values().cloned().collect::<Vec<_>>();
        sort_newest_first(&mut jobs);
        Ok(jobs)
    }
}

const LOCK_TTL_MS: u64 = 5_000;
const LOCK_ATTEMPTS: u32 = 40;
const LOCK_BACKOFF_MS: u64 = 25;

/// Jobs as JSON strings under `{prefix}:{job_id}`, with a set index for
/// listing. Updates hold a short per-job lease so read-apply-write is atomic
/// per record.
#[derive(Debug, Clone)]
pub struct RedisJobStore {
    client: RedisClient,
    key_prefix: String,
}

impl RedisJobStore {
    pub fn new(client: RedisClient, key_prefix: String) -> Self {
        Self { client, key_prefix }
    }

    fn job_key(&self, job_id: &str) -> String {
        format!("{}:{job_id}", self.key_prefix)
    }

    fn index_key(&self) -> String {
        format!("{}:index", self.key_prefix)
    }

    fn lock_key(&self, job_id: &str) -> String {
        format!("{}:lock:{job_id}", self.key_prefix)
    }

    async fn connection(&self) -> StoreResult<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Backend(format!("redis connect failed: {e}")))
    }

    async fn acquire_lease(
        &self,
        conn: &mut MultiplexedConnection,
        job_id: &str,
    ) -> StoreResult<()> {
        let lock_key = self.lock_key(job_id);
        let token = format!("{job_id}-{}", Utc::now().timestamp_millis());
        for _ in 0..LOCK_ATTEMPTS {
            let acquired: Option<String> = redis::cmd("SET")
                .arg(&lock_key)
                .arg(&token)
                .arg("NX")
                .arg("PX")
                .arg(LOCK_TTL_MS)
                .query_async(conn)
                .await
                .map_err(|e| StoreError::Backend(format!("lease acquisition failed: {e}")))?;
            if acquired.is_some() {
                return Ok(());
            }
            sleep(Duration::from_millis(LOCK_BACKOFF_MS)).await;
        }
        Err(StoreError::Busy(job_id.to_string()))
    }

    async fn release_lease(&self, conn: &mut MultiplexedConnection, job_id: &str) {
        let released: Result<usize, _> = conn.del(self.lock_key(job_id)).await;
        if let Err(e) = released {
            warn!(job_id = %job_id, error = %e, "job lease release failed");
        }
    }

    async fn read_job(
        &self,
        conn: &mut MultiplexedConnection,
        job_id: &str,
    ) -> StoreResult<Option<SslJobRecord>> {
        let raw: Option<String> = conn
            .get(self.job_key(job_id))
            .await
            .map_err(|e| StoreError::Backend(format!("redis read failed: {e}")))?;
        raw.map(|s| decode(&s)).transpose()
    }

    async fn write_job(
        &self,
        conn: &mut MultiplexedConnection,
        job: &SslJobRecord,
    ) -> StoreResult<()> {
        let _: () = conn
            .set(self.job_key(&job.job_id), encode(job)?)
            .await
            .map_err(|e| StoreError::Backend(format!("redis write failed: {e}")))?;
        Ok(())
    }

    async fn apply_under_lease(
        &self,
        conn: &mut MultiplexedConnection,
        job_id: &str,
        update: &JobFieldUpdate,
    ) -> StoreResult<SslJobRecord> {
        let mut job = self
            .read_job(conn, job_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(job_id.to_string()))?;
        job.apply(update, Utc::now().timestamp())?;
        self.write_job(conn, &job).await?;
        Ok(job)
    }
}

#[async_trait]
impl JobStore for RedisJobStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn create_job(&self, job: &SslJobRecord) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        let created: Option<String> = redis::cmd("SET")
            .arg(self.job_key(&job.job_id))
            .arg(encode(job)?)
            .arg("NX")
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Backend(format!("redis write failed: {e}")))?;
        if created.is_none() {
            return Err(StoreError::DuplicateJob(job.job_id.clone()));
        }
        let _: usize = conn
            .sadd(self.index_key(), &job.job_id)
            .await
            .map_err(|e| StoreError::Backend(format!("redis index write failed: {e}")))?;
        debug!(job_id = %job.job_id, "job record created");
        Ok(())
    }

    async fn update_job_fields(
        &self,
        job_id: &str,
        update: &JobFieldUpdate,
    ) -> StoreResult<SslJobRecord> {
        let mut conn = self.connection().await?;
        self.acquire_lease(&mut conn, job_id).await?;
        let result = self.apply_under_lease(&mut conn, job_id, update).await;
        self.release_lease(&mut conn, job_id).await;
        result
    }

    async fn get_job(&self, job_id: &str) -> StoreResult<Option<SslJobRecord>> {
        let mut conn = self.connection().await?;
        self.read_job(&mut conn, job_id).await
    }

    async fn list_jobs(&self) -> StoreResult<Vec<SslJobRecord>> {
        let mut conn = self.connection().await?;
        let job_ids: Vec<String> = conn
            .smembers(self.index_key())
            .await
            .map_err(|e| StoreError::Backend(format!("redis index read failed: {e}")))?;
        if job_ids.is_empty() {
            return Ok(Vec::new());
        }
        let keys = job_ids
            .iter()
            .map(|id| self.job_key(id))
            .collect::<Vec<_>>();
        let raw: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Backend(format!("redis read failed: {e}")))?;
        let mut jobs = raw
            .into_iter()
            .flatten()
            .map(|s| decode(&s))
            .collect::<StoreResult<Vec<_>>>()?;
        sort_newest_first(&mut jobs);
        Ok(jobs)
    }
}

fn encode(job: &SslJobRecord) -> StoreResult<String> {
    serde_json::to_string(job).map_err(|e| StoreError::Decode(e.to_string()))
}

fn decode(raw: &str) -> StoreResult<SslJobRecord> {
    serde_json::from_str(raw).map_err(|e| StoreError::Decode(e.to_string()))
}

fn sort_newest_first(jobs: &mut [SslJobRecord]) {
    jobs.sort_by(|a, b| {
        b.creation_timestamp
            .cmp(&a.creation_timestamp)
            .then_with(|| a.job_id.cmp(&b.job_id))
    });
}
