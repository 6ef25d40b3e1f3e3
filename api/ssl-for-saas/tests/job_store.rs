use serde_json::json;
use ssl_for_saas::infra::job_store::{JobStore, MemoryJobStore, StoreError};
use ssl_for_saas::module::ssl_job::model::{JobFieldUpdate, SslJobRecord};
use ssl_for_saas::module::ssl_job::schema::{JobType, StageStatus};

fn record(job_id: &str, created_at: i64) -> SslJobRecord {
    SslJobRecord::new(
        job_id.to_string(),
        JobType::Create,
        json!({"acm_op": "create"}),
        1,
        false,
        created_at,
    )
}

#[tokio::test]
async fn create_never_overwrites_existing_job() {
    let store = MemoryJobStore::default();
    store.create_job(&record("job-1", 100)).await.expect("created");

    let err = store
        .create_job(&record("job-1", 200))
        .await
        .expect_err("duplicate");
    assert!(matches!(err, StoreError::DuplicateJob(id) if id == "job-1"));

    let stored = store.get_job("job-1").await.expect("read").expect("exists");
    assert_eq!(stored.creation_timestamp, 100);
}

#[tokio::test]
async fn list_is_newest_first() {
    let store = MemoryJobStore::default();
    store.create_job(&record("old", 100)).await.expect("created");
    store.create_job(&record("new", 300)).await.expect("created");
    store.create_job(&record("mid", 200)).await.expect("created");

    let ids = store
        .list_jobs()
        .await
        .expect("listed")
        .into_iter()
        .map(|j| j.job_id)
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["new", "mid", "old"]);
}

#[tokio::test]
async fn rejected_update_leaves_record_untouched() {
    let store = MemoryJobStore::default();
    store.create_job(&record("job-1", 100)).await.expect("created");

    let err = store
        .update_job_fields(
            "job-1",
            &JobFieldUpdate {
                cert_stage_status: Some(StageStatus::Failed),
                completed_cert_count: Some(5),
                prompt_info: Some("boom".to_string()),
                ..JobFieldUpdate::default()
            },
        )
        .await
        .expect_err("count above create_count");
    assert!(matches!(err, StoreError::Transition(_)));

    let stored = store.get_job("job-1").await.expect("read").expect("exists");
    assert_eq!(stored.cert_stage_status, StageStatus::InProgress);
    assert!(stored.prompt_info.is_empty());
}

#[tokio::test]
async fn update_of_unknown_job_is_not_found() {
    let store = MemoryJobStore::default();

    let err = store
        .update_job_fields("missing", &JobFieldUpdate::failed("boom"))
        .await
        .expect_err("not found");
    assert!(matches!(err, StoreError::NotFound(_)));
    assert!(store.get_job("missing").await.expect("read").is_none());
}
