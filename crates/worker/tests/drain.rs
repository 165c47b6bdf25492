use std::time::Duration;

use archivist_core::commit::JobStatus;
use archivist_core::session::{Sector, SessionConfig, Stage, Standard};
use archivist_pipeline::{commit, session, upload, validate, IngestContext, PipelineSettings};
use archivist_worker::{CommitWorker, WorkerConfig};
use tokio_util::sync::CancellationToken;

const ROWS: &str = "\
legacyId,identifier,title,levelOfDescription
A1,REF-1,Minutes 1901,Item
A2,REF-2,Letter book,Item
";

fn worker(ctx: &IngestContext) -> CommitWorker {
    let config = WorkerConfig {
        poll_interval: Duration::from_millis(10),
    };
    CommitWorker::new(ctx.clone(), &config)
}

/// A session with a queued commit job; returns (session id, job id).
async fn queued_job(ctx: &IngestContext, dir: &std::path::Path) -> (i64, i64) {
    let path = dir.join("batch.csv");
    std::fs::write(&path, ROWS).unwrap();

    let config = SessionConfig::new("Harbour board", Sector::Archive, Standard::Isadg);
    let created = session::configure(ctx, config, None).await.unwrap();
    session::advance(ctx, created.id, Stage::Upload).await.unwrap();
    upload::upload_path(ctx, created.id, &path).await.unwrap();
    session::advance(ctx, created.id, Stage::Validate).await.unwrap();
    validate::validate(ctx, created.id).await.unwrap();
    let job = commit::start_commit(ctx, created.id).await.unwrap();
    (created.id, job.id)
}

// ---------------------------------------------------------------------------
// Draining
// ---------------------------------------------------------------------------

#[tokio::test]
async fn drain_with_empty_queue_does_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = IngestContext::in_memory(PipelineSettings::under(dir.path().join("work")));

    assert_eq!(worker(&ctx).drain().await.unwrap(), 0);
}

#[tokio::test]
async fn drain_runs_queued_job_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = IngestContext::in_memory(PipelineSettings::under(dir.path().join("work")));
    let (session_id, job_id) = queued_job(&ctx, dir.path()).await;

    assert_eq!(worker(&ctx).drain().await.unwrap(), 1);

    let job = commit::job_status(&ctx, job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.counters.created_records, 2);
    assert_eq!(session::get(&ctx, session_id).await.unwrap().stage, Stage::Completed);

    // Claimed jobs are not picked up again.
    assert_eq!(worker(&ctx).drain().await.unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Poll loop
// ---------------------------------------------------------------------------

#[tokio::test]
async fn run_processes_jobs_until_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = IngestContext::in_memory(PipelineSettings::under(dir.path().join("work")));
    let (_, job_id) = queued_job(&ctx, dir.path()).await;

    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let worker = worker(&ctx);
        let cancel = cancel.clone();
        async move { worker.run(cancel).await }
    });

    let mut status = JobStatus::Queued;
    for _ in 0..100 {
        status = commit::job_status(&ctx, job_id).await.unwrap().status;
        if status == JobStatus::Completed {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(status, JobStatus::Completed);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("worker stops after cancellation")
        .unwrap();
}
