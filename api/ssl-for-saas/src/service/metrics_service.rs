use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

static JOBS_CREATED: AtomicU64 = AtomicU64::new(0);
static JOBS_COMPLETED: AtomicU64 = AtomicU64::new(0);
static JOBS_DELEGATED: AtomicU64 = AtomicU64::new(0);
static JOBS_FAILED: AtomicU64 = AtomicU64::new(0);

static CERTIFICATES_REQUESTED: AtomicU64 = AtomicU64::new(0);
static CERTIFICATES_IMPORTED: AtomicU64 = AtomicU64::new(0);

static REFRESH_FAILURES: AtomicU64 = AtomicU64::new(0);

static LAST_ERROR_TS: AtomicI64 = AtomicI64::new(0);

#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub jobs_created: u64,
    pub jobs_completed: u64,
    pub jobs_delegated: u64,
    pub jobs_failed: u64,
    pub certificates_requested: u64,
    pub certificates_imported: u64,
    pub refresh_failures: u64,
    pub last_error_ts: i64,
}

pub fn inc_jobs_created() {
    JOBS_CREATED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_jobs_completed() {
    JOBS_COMPLETED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_jobs_delegated() {
    JOBS_DELEGATED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_jobs_failed(ts: i64) {
    JOBS_FAILED.fetch_add(1, Ordering::Relaxed);
    LAST_ERROR_TS.store(ts, Ordering::Relaxed);
}

pub fn inc_certificates_requested() {
    CERTIFICATES_REQUESTED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_certificates_imported() {
    CERTIFICATES_IMPORTED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_refresh_failures() {
    REFRESH_FAILURES.fetch_add(1, Ordering::Relaxed);
}

pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        jobs_created: JOBS_CREATED.load(Ordering::Relaxed),
        jobs_completed: JOBS_COMPLETED.load(Ordering::Relaxed),
        jobs_delegated: JOBS_DELEGATED.load(Ordering::Relaxed),
        jobs_failed: JOBS_FAILED.load(Ordering::Relaxed),
        certificates_requested: CERTIFICATES_REQUESTED.load(Ordering::Relaxed),
        certificates_imported: CERTIFICATES_IMPORTED.load(Ordering::Relaxed),
        refresh_failures: REFRESH_FAILURES.load(Ordering::Relaxed),
        last_error_ts: LAST_ERROR_TS.load(Ordering::Relaxed),
    }
}
