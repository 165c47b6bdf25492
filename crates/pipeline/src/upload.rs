//! Upload stage: register a source file or directory and parse its rows.
//!
//! Each upload replaces the previous one: staged files, rows, mappings and
//! issues are discarded before the new source is registered. A successful
//! upload moves the session on to `map`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use archivist_core::digital_object::{base_name, FileIndex};
use archivist_core::error::CoreError;
use archivist_core::session::{IngestSession, Stage};
use archivist_core::types::DbId;
use archivist_core::upload::{detect_format, SourceFormat, UploadedFile};
use archivist_db::models::upload::CreateUploadedFile;

use crate::context::IngestContext;
use crate::error::PipelineResult;
use crate::source::{self, ParsedSource};

/// Sub-directory of the staging dir that ZIP archives extract into.
const EXTRACT_DIR: &str = "extracted";

/// Register a file or directory already on the server.
pub async fn upload_path(
    ctx: &IngestContext,
    session_id: DbId,
    path: &Path,
) -> PipelineResult<UploadedFile> {
    let session = upload_session(ctx, session_id).await?;

    let metadata = match tokio::fs::metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(CoreError::Validation(format!("Path '{}' does not exist", path.display())).into());
        }
        Err(e) => return Err(e.into()),
    };
    let original_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    if metadata.is_dir() {
        let staging = reset_staging(ctx, session_id).await?;
        tracing::debug!(session_id, staging = %staging.display(), "Staging reset for directory upload");
        return register(ctx, &session, SourceFormat::Directory, &original_name, path.to_path_buf(), 0)
            .await;
    }

    let format = detect_format(&original_name)?;
    check_size(ctx, metadata.len())?;
    let staging = reset_staging(ctx, session_id).await?;
    let stored = staging.join(&original_name);
    tokio::fs::copy(path, &stored).await?;
    register(ctx, &session, format, &original_name, stored, metadata.len()).await
}

/// Register an uploaded file body (multipart upload).
pub async fn upload_bytes(
    ctx: &IngestContext,
    session_id: DbId,
    file_name: &str,
    bytes: &[u8],
) -> PipelineResult<UploadedFile> {
    let session = upload_session(ctx, session_id).await?;
    let original_name = base_name(file_name.trim()).to_string();
    if original_name.is_empty() {
        return Err(CoreError::Validation("Uploaded file has no name".into()).into());
    }
    let format = detect_format(&original_name)?;
    check_size(ctx, bytes.len() as u64)?;

    let staging = reset_staging(ctx, session_id).await?;
    let stored = staging.join(&original_name);
    tokio::fs::write(&stored, bytes).await?;
    register(ctx, &session, format, &original_name, stored, bytes.len() as u64).await
}

async fn upload_session(ctx: &IngestContext, session_id: DbId) -> PipelineResult<IngestSession> {
    let session = ctx.session(session_id).await?;
    if session.stage != Stage::Upload {
        return Err(CoreError::transition(session.stage, Stage::Map).into());
    }
    Ok(session)
}

fn check_size(ctx: &IngestContext, size: u64) -> PipelineResult<()> {
    let limit = ctx.settings.max_upload_bytes;
    if size > limit {
        return Err(CoreError::Validation(format!(
            "File is {size} bytes; the upload limit is {limit} bytes"
        ))
        .into());
    }
    Ok(())
}

/// Empty the session's staging directory, creating it if needed.
async fn reset_staging(ctx: &IngestContext, session_id: DbId) -> PipelineResult<PathBuf> {
    let staging = ctx.settings.staging_dir(session_id);
    match tokio::fs::remove_dir_all(&staging).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    tokio::fs::create_dir_all(&staging).await?;
    Ok(staging)
}

async fn register(
    ctx: &IngestContext,
    session: &IngestSession,
    format: SourceFormat,
    original_name: &str,
    stored: PathBuf,
    file_size: u64,
) -> PipelineResult<UploadedFile> {
    let (parsed, payload_root) = match format {
        SourceFormat::Csv => {
            let bytes = tokio::fs::read(&stored).await?;
            let parsed = tokio::task::spawn_blocking(move || source::parse_csv(&bytes)).await??;
            (Some(parsed), None)
        }
        SourceFormat::Zip => {
            let dest = ctx.settings.staging_dir(session.id).join(EXTRACT_DIR);
            let archive = stored.clone();
            let root = dest.clone();
            let parsed = tokio::task::spawn_blocking(move || {
                source::extract_zip(&archive, &root)?;
                source::read_payload_root(&root).map(|(parsed, _)| parsed)
            })
            .await??;
            (Some(parsed), Some(dest))
        }
        SourceFormat::Directory => {
            let root = stored.clone();
            let parsed = tokio::task::spawn_blocking(move || {
                source::read_payload_root(&root).map(|(parsed, _)| parsed)
            })
            .await??;
            (Some(parsed), Some(stored.clone()))
        }
        SourceFormat::Ead => (None, None),
    };

    let ParsedSource {
        headers,
        rows,
        delimiter,
        encoding,
    } = parsed.unwrap_or(ParsedSource {
        headers: Vec::new(),
        rows: Vec::new(),
        delimiter: None,
        encoding: None,
    });

    let input = CreateUploadedFile {
        session_id: session.id,
        file_type: format,
        original_name: original_name.to_string(),
        stored_path: stored.to_string_lossy().into_owned(),
        extracted_path: payload_root.map(|p| p.to_string_lossy().into_owned()),
        file_size: i64::try_from(file_size).unwrap_or(i64::MAX),
        delimiter: delimiter.map(|d| char::from(d).to_string()),
        encoding,
        headers,
        row_count: rows.len() as i32,
    };

    ctx.store.clear_upload(session.id).await?;
    let file = ctx.store.add_file(&input).await?;
    ctx.store.replace_rows(session.id, &rows).await?;
    ctx.store.set_validation_current(session.id, false).await?;
    ctx.store.set_stage(session.id, Stage::Map).await?;

    tracing::info!(
        session_id = session.id,
        file_id = file.id,
        format = %format,
        rows = file.row_count,
        "Upload registered",
    );
    Ok(file)
}

/// Files uploaded for a session.
pub async fn files(ctx: &IngestContext, session_id: DbId) -> PipelineResult<Vec<UploadedFile>> {
    ctx.session(session_id).await?;
    Ok(ctx.store.list_files(session_id).await?)
}

/// Index of the digital-object payload of the session's upload, if it has
/// one. Fails when the staged payload has gone missing.
pub async fn payload_index(ctx: &IngestContext, session_id: DbId) -> PipelineResult<Option<(PathBuf, FileIndex)>> {
    let Some(file) = ctx.store.latest_file(session_id).await? else {
        return Ok(None);
    };
    let Some(root) = file.extracted_path.filter(|_| file.file_type.has_payload()) else {
        return Ok(None);
    };
    let root = PathBuf::from(root);
    let scan_root = root.clone();
    let files = tokio::task::spawn_blocking(move || source::scan_payload(&scan_root)).await??;
    Ok(Some((root, FileIndex::new(files))))
}
