//! Integration tests for the admin API.

mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;

#[tokio::test]
async fn test_admin_requires_bearer_token() {
    let app = helpers::TestApp::new().await;

    let missing = app.request("GET", "/api/admin/shares", None, None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    let wrong = app
        .request("GET", "/api/admin/shares", None, Some("not-the-token"))
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["error"], "UNAUTHORIZED");

    let ok = app.admin("GET", "/api/admin/shares", None).await;
    assert_eq!(ok.status, StatusCode::OK);
}

#[tokio::test]
async fn test_health() {
    let app = helpers::TestApp::new().await;
    let response = app.request("GET", "/api/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "ok");
    assert_eq!(response.body["data"]["storage"], "local");
}

#[tokio::test]
async fn test_create_download_share_expands_directories() {
    let app = helpers::TestApp::new().await;
    app.write_file("docs/a.txt", b"a").await;
    app.write_file("docs/sub/b.txt", b"b").await;
    app.write_file("c.txt", b"c").await;

    let response = app
        .admin(
            "POST",
            "/api/admin/shares/download",
            Some(json!({
                "entries": ["directory:docs", "file:c.txt"],
                "expires_in_minutes": 60,
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    let share = &response.body["data"];
    assert_eq!(share["kind"], "download");
    assert_eq!(
        share["file_keys"],
        json!(["docs/a.txt", "docs/sub/b.txt", "c.txt"])
    );
    assert!(share["expires_at"].is_string());

    let listing = app
        .request("GET", share["url"].as_str().unwrap(), None, None)
        .await;
    assert_eq!(listing.status, StatusCode::OK);
    assert_eq!(listing.body["files"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_create_download_share_validation() {
    let app = helpers::TestApp::new().await;
    app.admin("POST", "/api/admin/directories", Some(json!({ "name": "empty" })))
        .await;

    let none = app
        .admin("POST", "/api/admin/shares/download", Some(json!({ "entries": [] })))
        .await;
    assert_eq!(none.status, StatusCode::BAD_REQUEST);

    let empty_folder = app
        .admin(
            "POST",
            "/api/admin/shares/download",
            Some(json!({ "entries": ["directory:empty"] })),
        )
        .await;
    assert_eq!(empty_folder.status, StatusCode::BAD_REQUEST);

    let missing_file = app
        .admin(
            "POST",
            "/api/admin/shares/download",
            Some(json!({ "entries": ["file:nope.txt"] })),
        )
        .await;
    assert_eq!(missing_file.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_upload_share() {
    let app = helpers::TestApp::new().await;

    let no_target = app
        .admin("POST", "/api/admin/shares/upload", Some(json!({ "target_directory": "" })))
        .await;
    assert_eq!(no_target.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        no_target.body["message"],
        "Choose or create a folder before generating an upload link."
    );

    let created = app
        .admin(
            "POST",
            "/api/admin/shares/upload",
            Some(json!({ "target_directory": "/inbox/", "max_bytes": 2048 })),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["data"]["target_directory"], "inbox");
    assert_eq!(created.body["data"]["max_bytes"], 2048);
    assert_eq!(created.body["data"]["uploaded_bytes"], 0);
}

#[tokio::test]
async fn test_revoke_share() {
    let app = helpers::TestApp::new().await;
    app.write_file("a.txt", b"a").await;
    let token = app.download_share(&["a.txt"]).await;

    let revoked = app
        .admin("DELETE", &format!("/api/admin/shares/{token}"), None)
        .await;
    assert_eq!(revoked.status, StatusCode::OK);

    let gone = app
        .request("GET", &format!("/share/download/{token}"), None, None)
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);

    let again = app
        .admin("DELETE", &format!("/api/admin/shares/{token}"), None)
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_directories_and_uploads() {
    let app = helpers::TestApp::new().await;

    let created = app
        .admin(
            "POST",
            "/api/admin/directories",
            Some(json!({ "path": "", "name": "projects" })),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["data"]["path"], "projects");

    let duplicate = app
        .admin(
            "POST",
            "/api/admin/directories",
            Some(json!({ "path": "", "name": "projects" })),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let invalid = app
        .admin(
            "POST",
            "/api/admin/directories",
            Some(json!({ "path": "", "name": "a/b" })),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

    let (content_type, body) = helpers::multipart_body(
        &[("path", "projects")],
        &[("plan.md", b"# plan"), ("Thumbs.db", b"x")],
    );
    let req = Request::builder()
        .method("POST")
        .uri("/api/admin/files")
        .header("Authorization", format!("Bearer {}", helpers::ADMIN_TOKEN))
        .header("Content-Type", content_type)
        .body(Body::from(body))
        .unwrap();
    let uploaded = app.send(req).await;
    assert_eq!(uploaded.status, StatusCode::CREATED);
    assert_eq!(uploaded.body["data"]["keys"], json!(["projects/plan.md"]));
    assert_eq!(uploaded.body["data"]["skipped"], 1);

    let listing = app.admin("GET", "/api/admin/files?path=projects", None).await;
    assert_eq!(listing.status, StatusCode::OK);
    let files = listing.body["data"]["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["name"], "plan.md");

    let root = app.admin("GET", "/api/admin/files", None).await;
    assert_eq!(root.body["data"]["directories"][0]["name"], "projects");
}

#[tokio::test]
async fn test_delete_file_updates_shares() {
    let app = helpers::TestApp::new().await;
    app.write_file("a.txt", b"a").await;
    app.write_file("b.txt", b"b").await;
    let only_a = app.download_share(&["a.txt"]).await;
    let both = app.download_share(&["a.txt", "b.txt"]).await;

    let deleted = app.admin("DELETE", "/api/admin/files?key=a.txt", None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert!(!app.file_path("a.txt").exists());

    let shares = app.admin("GET", "/api/admin/shares", None).await;
    let shares = shares.body["data"].as_array().unwrap();
    assert_eq!(shares.len(), 1);
    assert_eq!(shares[0]["token"], both.as_str());
    assert_eq!(shares[0]["file_keys"], json!(["b.txt"]));

    let gone = app
        .request("GET", &format!("/share/download/{only_a}"), None, None)
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_directory_updates_shares() {
    let app = helpers::TestApp::new().await;
    app.write_file("docs/a.txt", b"a").await;
    app.write_file("docs/sub/b.txt", b"b").await;
    app.write_file("keep.txt", b"k").await;
    let token = app
        .download_share(&["docs/a.txt", "docs/sub/b.txt", "keep.txt"])
        .await;

    let response = app
        .admin("DELETE", "/api/admin/directories?path=docs", None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["removed_files"], 2);

    let listing = app
        .request("GET", &format!("/share/download/{token}"), None, None)
        .await;
    let files = listing.body["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["key"], "keep.txt");
}

#[tokio::test]
async fn test_move_rewrites_share_keys() {
    let app = helpers::TestApp::new().await;
    app.write_file("docs/a.txt", b"a").await;
    app.write_file("c.txt", b"c").await;
    app.write_file("archive/c.txt", b"taken").await;
    let token = app.download_share(&["docs/a.txt"]).await;

    let moved = app
        .admin(
            "POST",
            "/api/admin/move",
            Some(json!({ "entries": ["directory:docs"], "destination": "archive" })),
        )
        .await;
    assert_eq!(moved.status, StatusCode::OK);
    assert_eq!(moved.body["data"]["moved"][0]["to"], "archive/docs/a.txt");
    assert!(app.file_path("archive/docs/a.txt").exists());

    let listing = app
        .request("GET", &format!("/share/download/{token}"), None, None)
        .await;
    assert_eq!(listing.body["files"][0]["key"], "archive/docs/a.txt");

    let occupied = app
        .admin(
            "POST",
            "/api/admin/move",
            Some(json!({ "entries": ["file:c.txt"], "destination": "archive" })),
        )
        .await;
    assert_eq!(occupied.status, StatusCode::CONFLICT);
    assert!(app.file_path("c.txt").exists());
}

#[tokio::test]
async fn test_raw_file_is_not_cached() {
    let app = helpers::TestApp::new().await;
    app.write_file("docs/raw.txt", b"raw bytes").await;

    let req = Request::builder()
        .uri("/api/admin/raw/docs/raw.txt")
        .header("Authorization", format!("Bearer {}", helpers::ADMIN_TOKEN))
        .body(Body::empty())
        .unwrap();
    let response = app.send(req).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.bytes.as_ref(), b"raw bytes");
    assert_eq!(response.header("cache-control"), Some("private, no-store"));
    assert_eq!(response.header("content-type"), Some("text/plain"));

    let missing = app.admin("GET", "/api/admin/raw/docs/none.txt", None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let escape = app.admin("GET", "/api/admin/raw/../secret", None).await;
    assert_ne!(escape.status, StatusCode::OK);
}

#[tokio::test]
async fn test_unnormalized_selection_follows_moves() {
    let app = helpers::TestApp::new().await;
    app.write_file("docs/a.txt", b"a").await;

    let created = app
        .admin(
            "POST",
            "/api/admin/shares/download",
            Some(json!({ "entries": ["file:/docs/a.txt"] })),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["data"]["file_keys"], json!(["docs/a.txt"]));
    let token = created.body["data"]["token"].as_str().unwrap().to_string();

    let moved = app
        .admin(
            "POST",
            "/api/admin/move",
            Some(json!({ "entries": ["file:docs/a.txt"], "destination": "archive" })),
        )
        .await;
    assert_eq!(moved.status, StatusCode::OK);

    let listing = app
        .request("GET", &format!("/share/download/{token}"), None, None)
        .await;
    assert_eq!(listing.status, StatusCode::OK);
    assert_eq!(listing.body["files"][0]["key"], "archive/a.txt");

    let deleted = app
        .admin("DELETE", "/api/admin/files?key=%2Farchive%2Fa.txt", None)
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    let shares = app.admin("GET", "/api/admin/shares", None).await;
    assert_eq!(shares.body["data"].as_array().unwrap().len(), 0);
}
