mod common;

use archivist_core::error::CoreError;
use archivist_core::fields::is_target_field;
use archivist_core::mapping::MappingEdit;
use archivist_core::session::{Sector, SessionConfig, Stage, Standard};
use archivist_pipeline::error::PipelineError;
use archivist_pipeline::{commit, export, mapping, preview, session, upload, validate};
use assert_matches::assert_matches;
use common::{archive_config, Harness, THREE_GOOD_ROWS, THREE_ROWS_ONE_UNTITLED};

// ---------------------------------------------------------------------------
// Stage transitions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn skipping_a_stage_is_rejected_and_changes_nothing() {
    let h = Harness::new();
    let created = session::configure(&h.ctx, archive_config(), None).await.unwrap();
    assert_eq!(created.stage, Stage::Configure);

    let err = session::advance(&h.ctx, created.id, Stage::Validate).await.unwrap_err();
    assert_matches!(err, PipelineError::Core(CoreError::InvalidTransition { .. }));
    assert_eq!(h.stage(created.id).await, Stage::Configure);
}

#[tokio::test]
async fn leaving_upload_requires_a_file() {
    let h = Harness::new();
    let created = h.session_at_upload(archive_config()).await;

    let err = session::advance(&h.ctx, created.id, Stage::Map).await.unwrap_err();
    assert_matches!(err, PipelineError::Core(CoreError::Validation(_)));
    assert_eq!(h.stage(created.id).await, Stage::Upload);
}

#[tokio::test]
async fn configure_rejects_incompatible_standard() {
    let h = Harness::new();
    let mut config = archive_config();
    config.sector = archivist_core::session::Sector::Museum;
    config.standard = Standard::Rad;

    let err = session::configure(&h.ctx, config, None).await.unwrap_err();
    assert_matches!(err, PipelineError::Core(CoreError::Validation(_)));
}

#[tokio::test]
async fn cancel_only_before_commit() {
    let h = Harness::new();
    let created = h.session_at_upload(archive_config()).await;

    let cancelled = session::cancel(&h.ctx, created.id).await.unwrap();
    assert_eq!(cancelled.stage, Stage::Cancelled);

    let err = session::cancel(&h.ctx, created.id).await.unwrap_err();
    assert_matches!(err, PipelineError::Core(CoreError::InvalidTransition { .. }));
}

#[tokio::test]
async fn parent_search_matches_titles_ignoring_case() {
    let h = Harness::new();
    let fonds = h.records.add_existing("FONDS-9", "Harbour board fonds").await;
    h.records.add_existing("FONDS-10", "Town council minutes").await;

    let found = session::search_parents(&h.ctx, " HARBOUR ").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, fonds);
    assert_eq!(found[0].title, "Harbour board fonds");

    assert!(session::search_parents(&h.ctx, "o").await.unwrap().is_empty());
    assert_eq!(session::search_parents(&h.ctx, "ou").await.unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let h = Harness::new();
    let err = session::get(&h.ctx, 404).await.unwrap_err();
    assert_matches!(
        err,
        PipelineError::Core(CoreError::NotFound {
            entity: "ingest_session",
            id: 404
        })
    );
}

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

#[tokio::test]
async fn csv_upload_parses_rows_and_moves_to_map() {
    let h = Harness::new();
    let created = h.session_at_upload(archive_config()).await;
    let path = h.write("batch.csv", THREE_GOOD_ROWS);

    let file = upload::upload_path(&h.ctx, created.id, &path).await.unwrap();
    assert_eq!(file.row_count, 3);
    assert_eq!(file.headers, vec!["legacyId", "identifier", "title", "levelOfDescription"]);
    assert_eq!(file.delimiter.as_deref(), Some(","));
    assert_eq!(h.stage(created.id).await, Stage::Map);
}

#[tokio::test]
async fn unsupported_upload_leaves_session_in_upload() {
    let h = Harness::new();
    let created = h.session_at_upload(archive_config()).await;
    let path = h.write("notes.docx", b"not a spreadsheet");

    let err = upload::upload_path(&h.ctx, created.id, &path).await.unwrap_err();
    assert_matches!(err, PipelineError::Core(CoreError::UnsupportedFormat(_)));
    assert_eq!(h.stage(created.id).await, Stage::Upload);
    assert!(upload::files(&h.ctx, created.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let mut h = Harness::new();
    let mut settings = (*h.ctx.settings).clone();
    settings.max_upload_bytes = 8;
    h.ctx.settings = std::sync::Arc::new(settings);
    let created = h.session_at_upload(archive_config()).await;

    let err = upload::upload_bytes(&h.ctx, created.id, "batch.csv", THREE_GOOD_ROWS.as_bytes())
        .await
        .unwrap_err();
    assert_matches!(err, PipelineError::Core(CoreError::Validation(_)));
}

#[tokio::test]
async fn multipart_body_is_staged_under_the_session() {
    let h = Harness::new();
    let created = h.session_at_upload(archive_config()).await;

    let file = upload::upload_bytes(&h.ctx, created.id, "../../batch.csv", THREE_GOOD_ROWS.as_bytes())
        .await
        .unwrap();
    assert_eq!(file.original_name, "batch.csv");
    assert!(file.stored_path.starts_with(&*h.ctx.settings.staging_dir(created.id).to_string_lossy()));
}

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unmapped_column_blocks_validation_until_ignored() {
    let h = Harness::new();
    let created = h.session_at_upload(archive_config()).await;
    let path = h.write(
        "batch.csv",
        "legacyId,identifier,title,levelOfDescription,Box label\nA1,REF-1,Minutes,Item,B-12\n",
    );
    upload::upload_path(&h.ctx, created.id, &path).await.unwrap();

    let err = session::advance(&h.ctx, created.id, Stage::Validate).await.unwrap_err();
    assert_matches!(
        err,
        PipelineError::Core(CoreError::MappingIncomplete(ref cols)) if cols == &vec!["Box label".to_string()]
    );
    assert_eq!(h.stage(created.id).await, Stage::Map);

    let edit = MappingEdit {
        source_column: "Box label".into(),
        target_field: None,
        default_value: None,
        transform: None,
        is_ignored: true,
    };
    mapping::save_mappings(&h.ctx, created.id, &[edit], None).await.unwrap();
    let moved = session::advance(&h.ctx, created.id, Stage::Validate).await.unwrap();
    assert_eq!(moved.stage, Stage::Validate);
}

#[tokio::test]
async fn mapping_edit_to_unknown_field_is_rejected() {
    let h = Harness::new();
    let created = h.session_at_upload(archive_config()).await;
    let path = h.write("batch.csv", THREE_GOOD_ROWS);
    upload::upload_path(&h.ctx, created.id, &path).await.unwrap();

    let edit = MappingEdit {
        source_column: "title".into(),
        target_field: Some("objectNumber".into()),
        default_value: None,
        transform: None,
        is_ignored: false,
    };
    let err = mapping::save_mappings(&h.ctx, created.id, &[edit], None).await.unwrap_err();
    assert_matches!(err, PipelineError::Core(CoreError::Validation(_)));

    let current = mapping::mappings(&h.ctx, created.id).await.unwrap();
    let title = current.iter().find(|m| m.source_column == "title").unwrap();
    assert_eq!(title.target_field.as_deref(), Some("title"));
}

#[tokio::test]
async fn saved_profile_maps_a_later_upload() {
    let h = Harness::new();
    let csv = "Ref,Name,Level\nREF-1,Minutes,Item\n";
    let edits = [("Ref", "identifier"), ("Name", "title"), ("Level", "levelOfDescription")].map(
        |(source, target)| MappingEdit {
            source_column: source.into(),
            target_field: Some(target.into()),
            default_value: None,
            transform: None,
            is_ignored: false,
        },
    );

    let first = h.session_at_upload(archive_config()).await;
    let path = h.write("first.csv", csv);
    upload::upload_path(&h.ctx, first.id, &path).await.unwrap();
    mapping::save_mappings(&h.ctx, first.id, &edits, None).await.unwrap();
    let profile = mapping::save_profile(&h.ctx, first.id, "Harbour board", None).await.unwrap();
    assert_eq!(profile.entries.len(), 3);

    let err = mapping::save_profile(&h.ctx, first.id, "Harbour board", None).await.unwrap_err();
    assert_matches!(err, PipelineError::Store(_));

    let second = h.session_at_upload(archive_config()).await;
    let path = h.write("second.csv", csv);
    upload::upload_path(&h.ctx, second.id, &path).await.unwrap();
    let (mapped, applied) = mapping::load_profile(&h.ctx, second.id, profile.id).await.unwrap();
    assert_eq!(applied, 3);
    assert!(mapped.iter().all(|m| m.is_active()));
    assert_eq!(mapping::list_profiles(&h.ctx).await.unwrap().len(), 1);
}

#[tokio::test]
async fn profile_from_another_standard_only_sets_shared_fields() {
    let h = Harness::new();
    let csv = "Number,Name,Title\nOBJ-1,Chair,Harbour chair\n";
    let edits = [("Number", "objectNumber"), ("Name", "objectName"), ("Title", "title")].map(
        |(source, target)| MappingEdit {
            source_column: source.into(),
            target_field: Some(target.into()),
            default_value: None,
            transform: None,
            is_ignored: false,
        },
    );

    let museum = SessionConfig::new("Furniture", Sector::Museum, Standard::Spectrum);
    let first = h.session_at_upload(museum).await;
    let path = h.write("objects.csv", csv);
    upload::upload_path(&h.ctx, first.id, &path).await.unwrap();
    mapping::save_mappings(&h.ctx, first.id, &edits, None).await.unwrap();
    let profile = mapping::save_profile(&h.ctx, first.id, "Furniture", None).await.unwrap();
    assert_eq!(profile.entries.len(), 3);

    let second = h.session_at_upload(archive_config()).await;
    let path = h.write("archive.csv", csv);
    upload::upload_path(&h.ctx, second.id, &path).await.unwrap();
    let (mapped, applied) = mapping::load_profile(&h.ctx, second.id, profile.id).await.unwrap();

    assert_eq!(applied, 1);
    let title = mapped.iter().find(|m| m.source_column == "Title").unwrap();
    assert_eq!(title.target_field.as_deref(), Some("title"));
    assert!(mapped
        .iter()
        .filter_map(|m| m.target_field.as_deref())
        .all(|t| is_target_field(Standard::Isadg, t)));
}

#[tokio::test]
async fn changing_standard_resets_mappings() {
    let h = Harness::new();
    let created = h.session_at_upload(archive_config()).await;
    let path = h.write("batch.csv", "Ref,title\nREF-1,Minutes\n");
    upload::upload_path(&h.ctx, created.id, &path).await.unwrap();
    let edit = MappingEdit {
        source_column: "Ref".into(),
        target_field: Some("identifier".into()),
        default_value: None,
        transform: None,
        is_ignored: false,
    };
    mapping::save_mappings(&h.ctx, created.id, &[edit], None).await.unwrap();

    let mut config = archive_config();
    config.standard = Standard::Dacs;
    session::update_config(&h.ctx, created.id, config).await.unwrap();

    let current = mapping::mappings(&h.ctx, created.id).await.unwrap();
    let reference = current.iter().find(|m| m.source_column == "Ref").unwrap();
    assert_eq!(reference.target_field, None);
}

// ---------------------------------------------------------------------------
// Validation, fixes and preview
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_title_blocks_until_the_row_is_excluded() {
    let h = Harness::new();
    let id = h.csv_session(archive_config(), THREE_ROWS_ONE_UNTITLED).await;

    let report = validate::validate(&h.ctx, id).await.unwrap();
    assert_eq!(report.stats.total, 3);
    assert_eq!(report.stats.valid, 2);
    assert_eq!(report.stats.errors, 1);
    assert_eq!(report.issues[0].row_number, 2);

    let err = session::advance(&h.ctx, id, Stage::Preview).await.unwrap_err();
    assert_matches!(err, PipelineError::Core(CoreError::ValidationBlocked(_)));
    assert_eq!(h.stage(id).await, Stage::Validate);

    validate::exclude_row(&h.ctx, id, 2).await.unwrap();
    let report = validate::validate(&h.ctx, id).await.unwrap();
    assert_eq!(report.stats.total, 2);
    assert_eq!(report.stats.valid, 2);
    assert!(report.issues.is_empty());

    let moved = session::advance(&h.ctx, id, Stage::Preview).await.unwrap();
    assert_eq!(moved.stage, Stage::Preview);
}

#[tokio::test]
async fn validation_is_idempotent() {
    let h = Harness::new();
    let id = h.csv_session(archive_config(), THREE_ROWS_ONE_UNTITLED).await;

    let first = validate::validate(&h.ctx, id).await.unwrap();
    let second = validate::validate(&h.ctx, id).await.unwrap();
    assert_eq!(first.stats, second.stats);
    assert_eq!(first.issues, second.issues);
}

#[tokio::test]
async fn fix_makes_validation_stale_until_rerun() {
    let h = Harness::new();
    let id = h.csv_session(archive_config(), THREE_ROWS_ONE_UNTITLED).await;
    validate::validate(&h.ctx, id).await.unwrap();

    let fixed = validate::fix_row(&h.ctx, id, 2, "title", "Letter book").await.unwrap();
    assert_eq!(fixed.title(), Some("Letter book"));

    let report = validate::issues(&h.ctx, id).await.unwrap();
    assert!(!report.validation_current);
    let err = session::advance(&h.ctx, id, Stage::Preview).await.unwrap_err();
    assert_matches!(err, PipelineError::Core(CoreError::ValidationBlocked(_)));

    let report = validate::validate(&h.ctx, id).await.unwrap();
    assert_eq!(report.stats.valid, 3);
    session::advance(&h.ctx, id, Stage::Preview).await.unwrap();
}

#[tokio::test]
async fn fix_rejects_excluded_rows_and_unknown_fields() {
    let h = Harness::new();
    let id = h.csv_session(archive_config(), THREE_ROWS_ONE_UNTITLED).await;

    let err = validate::fix_row(&h.ctx, id, 9, "title", "x").await.unwrap_err();
    assert_matches!(err, PipelineError::Core(CoreError::RowNotFound(9)));

    let err = validate::fix_row(&h.ctx, id, 1, "boxLabel", "x").await.unwrap_err();
    assert_matches!(err, PipelineError::Core(CoreError::Validation(_)));

    validate::exclude_row(&h.ctx, id, 2).await.unwrap();
    let err = validate::fix_row(&h.ctx, id, 2, "title", "x").await.unwrap_err();
    assert_matches!(err, PipelineError::Core(CoreError::RowNotFound(2)));

    let row = validate::include_row(&h.ctx, id, 2).await.unwrap();
    assert!(!row.is_excluded);
}

#[tokio::test]
async fn preview_builds_the_csv_hierarchy() {
    let h = Harness::new();
    let mut config = archive_config();
    config.parent_placement = archivist_core::session::ParentPlacement::CsvHierarchy;
    let csv = "\
legacyId,parentId,identifier,title,levelOfDescription
S1,,REF-1,Board series,Series
F1,S1,REF-2,Minutes file,File
I1,F1,REF-3,Meeting 1901,Item
";
    let id = h.csv_session(config, csv).await;
    validate::validate(&h.ctx, id).await.unwrap();

    let preview = preview::preview(&h.ctx, id).await.unwrap();
    assert_eq!(preview.summary.included_rows, 3);
    assert_eq!(preview.summary.eligible_rows, 3);
    assert_eq!(preview.summary.matched_digital_objects, 0);
    assert_eq!(preview.tree.len(), 1);
    assert_eq!(preview.tree[0].children.len(), 1);
    assert_eq!(preview.tree[0].children[0].children.len(), 1);
}

#[tokio::test]
async fn unknown_parent_reference_is_an_error_unless_it_exists() {
    let h = Harness::new();
    let mut config = archive_config();
    config.parent_placement = archivist_core::session::ParentPlacement::CsvHierarchy;
    let csv = "\
legacyId,parentId,identifier,title,levelOfDescription
F1,FONDS-9,REF-1,Minutes file,File
";
    let id = h.csv_session(config, csv).await;
    let report = validate::validate(&h.ctx, id).await.unwrap();
    assert_eq!(report.stats.errors, 1);

    h.records.add_existing("FONDS-9", "Harbour board fonds").await;
    let report = validate::validate(&h.ctx, id).await.unwrap();
    assert_eq!(report.stats.errors, 0);
}

#[tokio::test]
async fn parent_reference_may_name_an_existing_title() {
    let h = Harness::new();
    let fonds = h.records.add_existing("FONDS-9", "Harbour board fonds").await;
    let mut config = archive_config();
    config.parent_placement = archivist_core::session::ParentPlacement::CsvHierarchy;
    let csv = "\
legacyId,parentId,identifier,title,levelOfDescription
F1,Harbour board fonds,REF-1,Minutes file,File
";
    let id = h.csv_session(config, csv).await;
    let report = validate::validate(&h.ctx, id).await.unwrap();
    assert_eq!(report.stats.errors, 0);

    let job = commit::start_commit(&h.ctx, id).await.unwrap();
    commit::run_job(&h.ctx, job.id).await.unwrap();
    let created = h.records.created().await;
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].1.parent_id, Some(fonds));
}

// ---------------------------------------------------------------------------
// Exports
// ---------------------------------------------------------------------------

#[tokio::test]
async fn manifest_csv_lists_every_row_before_commit() {
    let h = Harness::new();
    let id = h.csv_session(archive_config(), THREE_GOOD_ROWS).await;
    validate::validate(&h.ctx, id).await.unwrap();

    let csv = export::manifest_csv(&h.ctx, id).await.unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[1].starts_with("1,A1,Minutes 1901,Item,,,false,true"));
}
