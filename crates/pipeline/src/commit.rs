//! Commit engine: turn eligible rows into records and digital objects.
//!
//! [`start_commit`] queues a job and returns at once. The job is executed
//! either in-process ([`spawn_job`]) or by the worker, which claims queued
//! jobs and hands them to [`execute_claimed`]. Claiming moves a job from
//! `queued` to `running` exactly once, so a job never runs twice.
//!
//! A row-level failure is logged against the row and counted; the job goes
//! on. Only setup problems (store failures, a vanished payload, a parent
//! that could not be created) fail the job as a whole.

use std::collections::HashMap;
use std::path::PathBuf;

use archivist_core::commit::{
    check_can_start, stage, CommitJob, ErrorLogEntry, JobCounters, JobStatus, ManifestKind,
    PackageKind, RowOutcome,
};
use archivist_core::digital_object::FileIndex;
use archivist_core::error::CoreError;
use archivist_core::fields::{
    vocabulary_match, CULTURE, DEFAULT_CULTURE, DEFAULT_PUBLICATION_STATUS, IDENTIFIER,
    PUBLICATION_STATUS, PUBLICATION_STATUSES,
};
use archivist_core::hierarchy::{legacy_index, plan_commit_order, UNTITLED};
use archivist_core::row::DataRow;
use archivist_core::session::{check_transition, IngestSession, ParentPlacement, Stage};
use archivist_core::types::{DbId, RowNumber};
use archivist_db::models::manifest::CreateManifestEntry;
use chrono::Utc;
use tokio::task::JoinHandle;

use crate::collaborators::{NewDigitalObject, NewRecord, PackageRequest};
use crate::context::IngestContext;
use crate::error::{CommitRowError, PipelineError, PipelineResult};
use crate::upload::payload_index;

// ── Starting a job ───────────────────────────────────────────────────

/// Queue a commit job and move the session to `commit`.
///
/// Allowed from `validate` or `preview` with a current validation, and
/// from `failed` to retry. On a retry, rows already committed by the
/// earlier job are left out.
pub async fn start_commit(ctx: &IngestContext, session_id: DbId) -> PipelineResult<CommitJob> {
    let session = ctx.session(session_id).await?;
    check_transition(session.stage, Stage::Commit)?;
    if session.stage != Stage::Failed && !session.validation_current {
        return Err(CoreError::ValidationBlocked(
            "Validation is out of date; run validation again before committing".into(),
        )
        .into());
    }

    let latest = ctx.store.latest_job(session_id).await?;
    check_can_start(latest.as_ref().map(|j| j.status))?;

    let rows = ctx.store.list_rows(session_id).await?;
    let committed = committed_rows(ctx, session_id).await?;
    let pending = rows
        .iter()
        .filter(|r| r.is_eligible() && !committed.contains_key(&r.row_number))
        .count();
    if pending == 0 {
        return Err(CoreError::ValidationBlocked("There are no valid rows to commit".into()).into());
    }

    let job = ctx.store.create_job(session_id, pending as i32).await?;
    ctx.store.set_stage(session_id, Stage::Commit).await?;
    tracing::info!(
        session_id,
        job_id = job.id,
        rows = pending,
        retry = latest.is_some(),
        "Commit job queued",
    );
    Ok(job)
}

/// Rows of the session that have a live record from an earlier job.
async fn committed_rows(ctx: &IngestContext, session_id: DbId) -> PipelineResult<HashMap<RowNumber, DbId>> {
    let entries = ctx.store.list_manifest(session_id).await?;
    Ok(entries
        .into_iter()
        .filter(|e| e.is_live() && e.kind == ManifestKind::Record)
        .filter_map(|e| Some((e.row_number?, e.target_id)))
        .collect())
}

// ── Running a job ────────────────────────────────────────────────────

/// Claim a queued job and run it to completion.
pub async fn run_job(ctx: &IngestContext, job_id: DbId) -> PipelineResult<CommitJob> {
    job_status(ctx, job_id).await?;
    let job = ctx
        .store
        .claim_job(job_id)
        .await?
        .ok_or_else(|| CoreError::Conflict(format!("Commit job {job_id} is not queued")))?;
    execute_claimed(ctx, job).await
}

/// Run the job on the tokio runtime and return immediately.
pub fn spawn_job(ctx: IngestContext, job_id: DbId) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = run_job(&ctx, job_id).await {
            tracing::error!(job_id, error = %e, "Commit job could not run");
        }
    })
}

/// Current state of a job, including its error log.
pub async fn job_status(ctx: &IngestContext, job_id: DbId) -> PipelineResult<CommitJob> {
    ctx.store.get_job(job_id).await?.ok_or_else(|| {
        CoreError::NotFound {
            entity: "ingest_job",
            id: job_id,
        }
        .into()
    })
}

/// A failure that ends the whole job, tagged with the stage it hit.
struct Fatal {
    stage: &'static str,
    error: PipelineError,
}

trait AtStage<T> {
    fn at(self, stage: &'static str) -> Result<T, Fatal>;
}

impl<T, E: Into<PipelineError>> AtStage<T> for Result<T, E> {
    fn at(self, stage: &'static str) -> Result<T, Fatal> {
        self.map_err(|e| Fatal {
            stage,
            error: e.into(),
        })
    }
}

/// Execute a job that has already been claimed (status `running`).
pub async fn execute_claimed(ctx: &IngestContext, job: CommitJob) -> PipelineResult<CommitJob> {
    let job_id = job.id;
    let session_id = job.session_id;
    tracing::info!(job_id, session_id, total = job.counters.total_rows, "Commit job started");

    let mut run = CommitRun {
        ctx,
        job_id,
        counters: job.counters,
        created: HashMap::new(),
    };

    match run.execute(session_id).await {
        Ok(()) => {
            ctx.store.finish_job(job_id, JobStatus::Completed).await?;
            ctx.store.set_stage(session_id, Stage::Completed).await?;
            tracing::info!(
                job_id,
                session_id,
                created_records = run.counters.created_records,
                created_dos = run.counters.created_dos,
                errors = run.counters.error_count,
                "Commit job completed",
            );
        }
        Err(Fatal { stage, error }) => {
            tracing::error!(job_id, session_id, stage, error = %error, "Commit job failed");
            run.counters.record_error();
            let entry = ErrorLogEntry::for_stage(stage, error.to_string(), Utc::now());
            if let Err(e) = ctx.store.append_job_log(job_id, &entry).await {
                tracing::warn!(job_id, error = %e, "Failure could not be logged on the job");
            }
            if let Err(e) = ctx.store.update_progress(job_id, &run.counters).await {
                tracing::warn!(job_id, error = %e, "Final counters could not be saved");
            }
            ctx.store.finish_job(job_id, JobStatus::Failed).await?;
            ctx.store.set_stage(session_id, Stage::Failed).await?;
        }
    }

    job_status(ctx, job_id).await
}

struct CommitRun<'a> {
    ctx: &'a IngestContext,
    job_id: DbId,
    counters: JobCounters,
    /// Row number → created record id, including rows committed by an
    /// earlier job of the same session.
    created: HashMap<RowNumber, DbId>,
}

/// The payload root with its index.
type Payload = Option<(PathBuf, FileIndex)>;

impl CommitRun<'_> {
    async fn execute(&mut self, session_id: DbId) -> Result<(), Fatal> {
        let ctx = self.ctx;
        let session = ctx.session(session_id).await.at(stage::SETUP)?;
        let rows = ctx.store.list_rows(session_id).await.at(stage::SETUP)?;
        self.created = committed_rows(ctx, session_id).await.at(stage::SETUP)?;
        let payload = payload_index(ctx, session_id).await.at(stage::SETUP)?;

        let eligible: Vec<&DataRow> = rows.iter().filter(|r| r.is_eligible()).collect();
        let pending: Vec<&DataRow> = eligible
            .iter()
            .copied()
            .filter(|r| !self.created.contains_key(&r.row_number))
            .collect();

        if session.config.output.create_records {
            let base_parent = self.base_parent(&session).await?;
            self.commit_rows(&session, &eligible, &pending, base_parent, &payload)
                .await?;
        } else {
            for _ in &pending {
                self.counters.record(RowOutcome::Skipped);
            }
            self.save_progress().await?;
        }

        self.generate_packages(&session).await?;
        Ok(())
    }

    /// Parent for rows that do not name one of their own.
    async fn base_parent(&mut self, session: &IngestSession) -> Result<Option<DbId>, Fatal> {
        match session.config.parent_placement {
            ParentPlacement::TopLevel | ParentPlacement::CsvHierarchy => Ok(None),
            ParentPlacement::Existing => Ok(session.config.parent_id),
            ParentPlacement::New => {
                if let Some(id) = session.config.parent_id {
                    return Ok(Some(id));
                }
                let (title, level) = session.config.new_parent();
                let record = NewRecord {
                    session_id: session.id,
                    title,
                    level_of_description: Some(level),
                    identifier: None,
                    legacy_id: None,
                    parent_id: None,
                    repository_id: session.config.repository_id,
                    security_classification_id: session.config.security_classification_id,
                    culture: DEFAULT_CULTURE.to_string(),
                    publication_status: DEFAULT_PUBLICATION_STATUS.to_string(),
                    fields: Default::default(),
                };
                let id = self
                    .ctx
                    .records
                    .create_record(&record)
                    .await
                    .at(stage::PARENT)?;
                self.manifest(session.id, None, ManifestKind::Parent, id)
                    .await
                    .at(stage::PARENT)?;
                self.ctx
                    .store
                    .set_parent_id(session.id, id)
                    .await
                    .at(stage::PARENT)?;
                tracing::info!(session_id = session.id, parent_id = id, "Parent record created");
                Ok(Some(id))
            }
        }
    }

    async fn commit_rows(
        &mut self,
        session: &IngestSession,
        eligible: &[&DataRow],
        pending: &[&DataRow],
        base_parent: Option<DbId>,
        payload: &Payload,
    ) -> Result<(), Fatal> {
        let plan = plan_commit_order(pending);
        let by_number: HashMap<RowNumber, &DataRow> =
            pending.iter().map(|r| (r.row_number, *r)).collect();
        let legacy = legacy_index(eligible);

        for row_number in plan.order {
            let Some(&row) = by_number.get(&row_number) else {
                continue;
            };
            let outcome = match self.resolve_parent(session, row, &legacy, base_parent).await {
                Ok(parent_id) => self.commit_row(session, row, parent_id, payload).await?,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(outcome) => self.counters.record(outcome),
                Err(e) => self.row_failed(row_number, e).await?,
            }
            self.save_progress().await?;
        }

        for row_number in plan.cyclic {
            self.row_failed(row_number, CommitRowError::Cycle).await?;
            self.save_progress().await?;
        }
        Ok(())
    }

    /// Parent record of a row under the session's placement.
    async fn resolve_parent(
        &self,
        session: &IngestSession,
        row: &DataRow,
        legacy: &HashMap<&str, RowNumber>,
        base_parent: Option<DbId>,
    ) -> Result<Option<DbId>, CommitRowError> {
        if session.config.parent_placement != ParentPlacement::CsvHierarchy {
            return Ok(base_parent);
        }
        let Some(reference) = row.parent_ref() else {
            return Ok(base_parent);
        };
        if let Some(&parent_row) = legacy.get(reference) {
            return match self.created.get(&parent_row) {
                Some(&id) => Ok(Some(id)),
                None => Err(CommitRowError::ParentFailed(parent_row)),
            };
        }
        match self.ctx.records.find_reference(reference).await {
            Ok(Some(id)) => Ok(Some(id)),
            Ok(None) => Err(CommitRowError::ParentUnresolved(reference.to_string())),
            Err(e) => Err(CommitRowError::Record(e)),
        }
    }

    /// Create one row's record and digital object. The outer result carries
    /// failures that end the job; the inner one failures of this row only.
    async fn commit_row(
        &mut self,
        session: &IngestSession,
        row: &DataRow,
        parent_id: Option<DbId>,
        payload: &Payload,
    ) -> Result<Result<RowOutcome, CommitRowError>, Fatal> {
        let record = new_record(session, row, parent_id);
        let record_id = match self.ctx.records.create_record(&record).await {
            Ok(id) => id,
            Err(e) => return Ok(Err(CommitRowError::Record(e))),
        };
        self.created.insert(row.row_number, record_id);
        self.manifest(session.id, Some(row.row_number), ManifestKind::Record, record_id)
            .await
            .at(stage::COMMIT)?;

        let Some((root, index)) = payload else {
            return Ok(Ok(RowOutcome::Created { digital_object: false }));
        };
        let Some(file) = index.resolve(session.config.do_match_strategy, row.match_keys()) else {
            return Ok(Ok(RowOutcome::Created { digital_object: false }));
        };

        let source = root.join(&file.relative_path);
        let attached = self
            .ctx
            .objects
            .attach(NewDigitalObject {
                record_id,
                source: &source,
                file,
                derivatives: &session.config.derivatives,
            })
            .await;
        let object_id = match attached {
            Ok(id) => id,
            Err(e) => {
                // The record stands; the row still counts as created.
                let error = CommitRowError::DigitalObject(e);
                tracing::warn!(job_id = self.job_id, row = row.row_number, error = %error, "Commit row error");
                self.log(ErrorLogEntry::for_row(row.row_number, error.to_string(), Utc::now()))
                    .await?;
                self.counters.record_error();
                return Ok(Ok(RowOutcome::Created { digital_object: false }));
            }
        };
        self.manifest(session.id, Some(row.row_number), ManifestKind::DigitalObject, object_id)
            .await
            .at(stage::COMMIT)?;

        for processor in session.config.processing.enabled() {
            if let Err(e) = self
                .ctx
                .processors
                .process(processor, object_id, &session.config.processing)
                .await
            {
                tracing::warn!(job_id = self.job_id, processor, object_id, error = %e, "Content processor failed");
                let message = format!("{processor} failed for digital object {object_id}: {e}");
                self.log(ErrorLogEntry::for_stage(stage::PROCESSING, message, Utc::now()))
                    .await?;
            }
        }

        Ok(Ok(RowOutcome::Created { digital_object: true }))
    }

    async fn row_failed(&mut self, row_number: RowNumber, error: CommitRowError) -> Result<(), Fatal> {
        tracing::warn!(job_id = self.job_id, row = row_number, error = %error, "Commit row error");
        self.counters.record(RowOutcome::Failed);
        self.log(ErrorLogEntry::for_row(row_number, error.to_string(), Utc::now()))
            .await
    }

    async fn generate_packages(&mut self, session: &IngestSession) -> Result<(), Fatal> {
        let output = &session.config.output;
        let wanted: Vec<PackageKind> = [
            (output.generate_sip, PackageKind::Sip),
            (output.generate_aip, PackageKind::Aip),
            (output.generate_dip, PackageKind::Dip),
        ]
        .into_iter()
        .filter_map(|(on, kind)| on.then_some(kind))
        .collect();
        if wanted.is_empty() {
            return Ok(());
        }

        let request = PackageRequest {
            session: session.clone(),
            job_id: self.job_id,
            entries: self
                .ctx
                .store
                .list_manifest(session.id)
                .await
                .at(stage::PACKAGE)?,
        };
        for kind in wanted {
            match self.ctx.packages.generate(kind, &request).await {
                Ok(package_id) => {
                    self.ctx
                        .store
                        .set_job_package(self.job_id, kind, &package_id)
                        .await
                        .at(stage::PACKAGE)?;
                    tracing::info!(job_id = self.job_id, kind = %kind, package_id = %package_id, "Package generated");
                }
                Err(e) => {
                    tracing::warn!(job_id = self.job_id, kind = %kind, error = %e, "Package generation failed");
                    let message = format!("{} generation failed: {e}", kind.as_str().to_uppercase());
                    self.log(ErrorLogEntry::for_stage(stage::PACKAGE, message, Utc::now()))
                        .await?;
                }
            }
        }
        Ok(())
    }

    async fn manifest(
        &self,
        session_id: DbId,
        row_number: Option<RowNumber>,
        kind: ManifestKind,
        target_id: DbId,
    ) -> PipelineResult<()> {
        let entry = CreateManifestEntry {
            session_id,
            job_id: self.job_id,
            row_number,
            kind,
            target_id,
        };
        self.ctx.store.add_manifest_entry(&entry).await?;
        Ok(())
    }

    async fn log(&self, entry: ErrorLogEntry) -> Result<(), Fatal> {
        self.ctx
            .store
            .append_job_log(self.job_id, &entry)
            .await
            .at(stage::COMMIT)
    }

    async fn save_progress(&self) -> Result<(), Fatal> {
        self.ctx
            .store
            .update_progress(self.job_id, &self.counters)
            .await
            .at(stage::COMMIT)
    }
}

/// The record a row describes.
fn new_record(session: &IngestSession, row: &DataRow, parent_id: Option<DbId>) -> NewRecord {
    NewRecord {
        session_id: session.id,
        title: row.title().unwrap_or(UNTITLED).to_string(),
        level_of_description: row.level_of_description().map(str::to_string),
        identifier: row.field(IDENTIFIER).map(str::to_string),
        legacy_id: row.legacy_id().map(str::to_string),
        parent_id,
        repository_id: session.config.repository_id,
        security_classification_id: session.config.security_classification_id,
        culture: row.field(CULTURE).unwrap_or(DEFAULT_CULTURE).to_string(),
        publication_status: row
            .field(PUBLICATION_STATUS)
            .and_then(|s| vocabulary_match(PUBLICATION_STATUSES, s))
            .unwrap_or(DEFAULT_PUBLICATION_STATUS)
            .to_string(),
        fields: row.fields.clone(),
    }
}
