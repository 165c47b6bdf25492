//! End-to-end tests of the `/api/v1/ingest` routes over the in-memory pipeline.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_bytes, body_json, build_test_app, get, post_json, put_json, send, TestApp};
use serde_json::json;

use archivist_core::row::FieldMap;
use archivist_pipeline::collaborators::NewRecord;
use archivist_pipeline::commit;

const THREE_ROWS_ONE_UNTITLED: &str = "\
legacyId,identifier,title,levelOfDescription
A1,REF-1,Minutes 1901,Item
A2,REF-2,,Item
A3,REF-3,Ledger,File
";

/// Create a session and take it through upload and mapping to `validate`.
async fn session_at_validate(app: &TestApp, csv: &str) -> i64 {
    let response = post_json(
        app,
        "/api/v1/ingest/sessions",
        json!({ "title": "Harbour board minutes", "sector": "archive", "standard": "isadg" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let uri = format!("/api/v1/ingest/sessions/{id}/advance");
    let response = post_json(app, &uri, json!({ "stage": "upload" })).await;
    assert_eq!(response.status(), StatusCode::OK);

    let path = app.write("batch.csv", csv);
    let response = post_json(
        app,
        &format!("/api/v1/ingest/sessions/{id}/upload"),
        json!({ "path": path }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = post_json(app, &uri, json!({ "stage": "validate" })).await;
    assert_eq!(response.status(), StatusCode::OK);
    id
}

// ---------------------------------------------------------------------------
// Test: the full wizard, from configure to rollback
// ---------------------------------------------------------------------------

#[tokio::test]
async fn wizard_runs_from_configure_to_rollback() {
    let app = build_test_app();
    let id = session_at_validate(&app, THREE_ROWS_ONE_UNTITLED).await;
    let base = format!("/api/v1/ingest/sessions/{id}");

    // Row 2 has no title.
    let response = post_json(&app, &format!("{base}/validate"), json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let stats = body_json(response).await["data"]["stats"].clone();
    assert_eq!(stats["total"], 3);
    assert_eq!(stats["valid"], 2);
    assert_eq!(stats["errors"], 1);

    let response = post_json(&app, &format!("{base}/advance"), json!({ "stage": "preview" })).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["code"], "VALIDATION_BLOCKED");

    let response = post_json(&app, &format!("{base}/rows/2/exclude"), json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = post_json(&app, &format!("{base}/validate"), json!({})).await;
    let stats = body_json(response).await["data"]["stats"].clone();
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["valid"], 2);

    let response = post_json(&app, &format!("{base}/advance"), json!({ "stage": "preview" })).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = get(&app, &format!("{base}/preview")).await;
    let preview = body_json(response).await;
    assert_eq!(preview["data"]["summary"]["eligible_rows"], 2);

    // Commit is queued, then run as the worker would.
    let response = post_json(&app, &format!("{base}/commit"), json!({})).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let job = body_json(response).await;
    assert_eq!(job["data"]["status"], "queued");
    let job_id = job["data"]["id"].as_i64().unwrap();
    commit::run_job(&app.ctx, job_id).await.unwrap();

    let response = get(&app, &format!("/api/v1/ingest/jobs/{job_id}")).await;
    let job = body_json(response).await;
    assert_eq!(job["data"]["status"], "completed");
    assert_eq!(job["data"]["created_records"], 2);
    assert_eq!(job["data"]["progress"]["percent"], 100);

    let response = get(&app, &format!("{base}/manifest")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    let csv = String::from_utf8(body_bytes(response).await).unwrap();
    assert_eq!(csv.lines().count(), 4);

    let response = post_json(&app, &format!("{base}/rollback"), json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let outcome = body_json(response).await;
    assert_eq!(outcome["data"]["deleted"], 2);
    assert_eq!(outcome["data"]["complete"], true);

    let response = post_json(&app, &format!("{base}/rollback"), json!({})).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "ALREADY_ROLLED_BACK");
}

// ---------------------------------------------------------------------------
// Test: error mapping on the wire
// ---------------------------------------------------------------------------

#[tokio::test]
async fn skipping_a_stage_returns_409() {
    let app = build_test_app();
    let response = post_json(
        &app,
        "/api/v1/ingest/sessions",
        json!({ "title": "Minutes", "sector": "archive", "standard": "isadg" }),
    )
    .await;
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = post_json(
        &app,
        &format!("/api/v1/ingest/sessions/{id}/advance"),
        json!({ "stage": "preview" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "INVALID_TRANSITION");

    let response = get(&app, &format!("/api/v1/ingest/sessions/{id}")).await;
    assert_eq!(body_json(response).await["data"]["stage"], "configure");
}

#[tokio::test]
async fn incompatible_standard_returns_400() {
    let app = build_test_app();
    let response = post_json(
        &app,
        "/api/v1/ingest/sessions",
        json!({ "title": "Objects", "sector": "museum", "standard": "rad" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn unknown_session_returns_404() {
    let app = build_test_app();
    let response = get(&app, "/api/v1/ingest/sessions/999").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

#[tokio::test]
async fn fix_with_empty_field_name_is_rejected() {
    let app = build_test_app();
    let id = session_at_validate(&app, THREE_ROWS_ONE_UNTITLED).await;

    let response = post_json(
        &app,
        &format!("/api/v1/ingest/sessions/{id}/rows/2/fix"),
        json!({ "field": "", "value": "Letter book" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        &app,
        &format!("/api/v1/ingest/sessions/{id}/rows/99/fix"),
        json!({ "field": "title", "value": "Letter book" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "ROW_NOT_FOUND");
}

#[tokio::test]
async fn unmapped_column_returns_422() {
    let app = build_test_app();
    let response = post_json(
        &app,
        "/api/v1/ingest/sessions",
        json!({ "title": "Minutes", "sector": "archive", "standard": "isadg" }),
    )
    .await;
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();
    let base = format!("/api/v1/ingest/sessions/{id}");
    post_json(&app, &format!("{base}/advance"), json!({ "stage": "upload" })).await;
    let path = app.write("batch.csv", "title,Box label\nMinutes,B-12\n");
    post_json(&app, &format!("{base}/upload"), json!({ "path": path })).await;

    let response = post_json(&app, &format!("{base}/advance"), json!({ "stage": "validate" })).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["code"], "MAPPING_INCOMPLETE");

    let response = put_json(
        &app,
        &format!("{base}/mappings"),
        json!({ "mappings": [{ "source_column": "Box label", "is_ignored": true }] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json(&app, &format!("{base}/advance"), json!({ "stage": "validate" })).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Test: uploads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn multipart_upload_registers_the_file() {
    let app = build_test_app();
    let response = post_json(
        &app,
        "/api/v1/ingest/sessions",
        json!({ "title": "Minutes", "sector": "archive", "standard": "isadg" }),
    )
    .await;
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();
    post_json(
        &app,
        &format!("/api/v1/ingest/sessions/{id}/advance"),
        json!({ "stage": "upload" }),
    )
    .await;

    let boundary = "archivist-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"batch.csv\"\r\n\
         Content-Type: text/csv\r\n\r\n\
         {THREE_ROWS_ONE_UNTITLED}\r\n\
         --{boundary}--\r\n"
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/v1/ingest/sessions/{id}/upload/file"))
        .header("content-type", format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .unwrap();
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let file = body_json(response).await;
    assert_eq!(file["data"]["original_name"], "batch.csv");
    assert_eq!(file["data"]["row_count"], 3);

    let response = get(&app, &format!("/api/v1/ingest/sessions/{id}/files")).await;
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unsupported_upload_returns_400() {
    let app = build_test_app();
    let response = post_json(
        &app,
        "/api/v1/ingest/sessions",
        json!({ "title": "Minutes", "sector": "archive", "standard": "isadg" }),
    )
    .await;
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();
    post_json(
        &app,
        &format!("/api/v1/ingest/sessions/{id}/advance"),
        json!({ "stage": "upload" }),
    )
    .await;
    let path = app.write("notes.docx", "not a spreadsheet");

    let response = post_json(
        &app,
        &format!("/api/v1/ingest/sessions/{id}/upload"),
        json!({ "path": path }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "UNSUPPORTED_FORMAT");
}

// ---------------------------------------------------------------------------
// Test: templates and profiles
// ---------------------------------------------------------------------------

#[tokio::test]
async fn template_download_is_csv() {
    let app = build_test_app();
    let response = get(&app, "/api/v1/ingest/template?sector=archive&standard=isadg").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .contains("ingest-template-archive-isadg.csv"));
    let csv = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(csv.lines().next().unwrap().contains("title"));

    let response = get(&app, "/api/v1/ingest/template?sector=museum&standard=rad").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_profile_name_returns_409() {
    let app = build_test_app();
    let id = session_at_validate(&app, THREE_ROWS_ONE_UNTITLED).await;
    let uri = format!("/api/v1/ingest/sessions/{id}/profiles");

    let response = post_json(&app, &uri, json!({ "name": "Harbour board" })).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let response = post_json(&app, &uri, json!({ "name": "Harbour board" })).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let response = post_json(&app, &uri, json!({ "name": "" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get(&app, "/api/v1/ingest/profiles").await;
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Test: parent record search
// ---------------------------------------------------------------------------

async fn seed_record(app: &TestApp, title: &str, identifier: &str) -> i64 {
    app.ctx
        .records
        .create_record(&NewRecord {
            session_id: 0,
            title: title.to_string(),
            level_of_description: Some("Fonds".to_string()),
            identifier: Some(identifier.to_string()),
            legacy_id: None,
            parent_id: None,
            repository_id: None,
            security_classification_id: None,
            culture: "en".to_string(),
            publication_status: "draft".to_string(),
            fields: FieldMap::new(),
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn record_search_matches_titles() {
    let app = build_test_app();
    let harbour = seed_record(&app, "Harbour board fonds", "HB").await;
    seed_record(&app, "Town council minutes", "TC").await;

    let response = get(&app, "/api/v1/ingest/records/search?q=harbour").await;
    assert_eq!(response.status(), StatusCode::OK);
    let found = body_json(response).await["data"].clone();
    let found = found.as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["id"], harbour);
    assert_eq!(found[0]["title"], "Harbour board fonds");
    assert_eq!(found[0]["identifier"], "HB");
    assert!(found[0]["slug"].as_str().unwrap().starts_with("harbour-board-fonds"));

    let response = get(&app, "/api/v1/ingest/records/search?q=o").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["data"].as_array().unwrap().is_empty());

    let response = get(&app, "/api/v1/ingest/records/search").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["data"].as_array().unwrap().is_empty());
}
