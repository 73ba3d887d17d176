//! Integration tests for download shares: listings, ranged file downloads,
//! and folder archives.

mod helpers;

use axum::http::StatusCode;

fn sample(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn test_listing_shows_shared_files() {
    let app = helpers::TestApp::new().await;
    app.write_file("a.txt", b"hello").await;
    app.write_file("docs/b.txt", b"world!").await;
    let token = app.download_share(&["a.txt", "docs/b.txt"]).await;

    let response = app
        .request("GET", &format!("/share/download/{token}"), None, None)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let files = response.body["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[1]["key"], "docs/b.txt");
    assert_eq!(files[1]["size"], 6);
    assert_eq!(
        files[1]["download_url"],
        format!("/share/download/{token}?file=docs%2Fb.txt")
    );
    assert_eq!(response.body["total_size"], 11);
}

#[tokio::test]
async fn test_unknown_token_is_not_found() {
    let app = helpers::TestApp::new().await;
    let response = app
        .request("GET", "/share/download/nope", None, None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["message"], "Download share not found or expired.");
}

#[tokio::test]
async fn test_single_file_ranges() {
    let app = helpers::TestApp::new().await;
    let data = sample(100);
    app.write_file("data.bin", &data).await;
    let token = app.download_share(&["data.bin"]).await;
    let path = format!("/share/download/{token}?file=data.bin");

    let full = app.fetch("GET", &path, None).await;
    assert_eq!(full.status, StatusCode::OK);
    assert_eq!(full.bytes.as_ref(), data.as_slice());
    assert_eq!(full.header("accept-ranges"), Some("bytes"));
    assert_eq!(full.header("content-length"), Some("100"));
    assert!(full.header("etag").unwrap().starts_with("W/\""));
    assert!(full.header("last-modified").unwrap().ends_with(" GMT"));
    assert_eq!(
        full.header("content-disposition"),
        Some("attachment; filename=\"data.bin\"; filename*=UTF-8''data.bin")
    );

    let first_half = app.fetch("GET", &path, Some("bytes=0-49")).await;
    assert_eq!(first_half.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(first_half.header("content-range"), Some("bytes 0-49/100"));
    assert_eq!(first_half.header("content-length"), Some("50"));
    assert_eq!(first_half.bytes.as_ref(), &data[..50]);

    let clamped = app.fetch("GET", &path, Some("bytes=90-200")).await;
    assert_eq!(clamped.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(clamped.header("content-range"), Some("bytes 90-99/100"));
    assert_eq!(clamped.bytes.as_ref(), &data[90..]);

    let suffix = app.fetch("GET", &path, Some("bytes=-5")).await;
    assert_eq!(suffix.bytes.as_ref(), &data[95..]);

    let beyond = app.fetch("GET", &path, Some("bytes=500-")).await;
    assert_eq!(beyond.status, StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(beyond.header("content-range"), Some("bytes */100"));
    assert!(beyond.bytes.is_empty());

    let multi = app.fetch("GET", &path, Some("bytes=0-1,4-5")).await;
    assert_eq!(multi.status, StatusCode::RANGE_NOT_SATISFIABLE);
}

#[tokio::test]
async fn test_head_reports_full_length() {
    let app = helpers::TestApp::new().await;
    app.write_file("data.bin", &sample(100)).await;
    let token = app.download_share(&["data.bin"]).await;

    let response = app
        .fetch(
            "HEAD",
            &format!("/share/download/{token}?file=data.bin"),
            Some("bytes=0-9"),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-length"), Some("100"));
    assert_eq!(response.header("accept-ranges"), Some("bytes"));
    assert!(response.bytes.is_empty());
}

#[tokio::test]
async fn test_file_outside_share_is_not_found() {
    let app = helpers::TestApp::new().await;
    app.write_file("a.txt", b"a").await;
    app.write_file("secret.txt", b"s").await;
    let token = app.download_share(&["a.txt"]).await;

    let response = app
        .fetch("GET", &format!("/share/download/{token}?file=secret.txt"), None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_folder_archive_and_ranges() {
    let app = helpers::TestApp::new().await;
    app.write_file("docs/a.txt", &sample(300)).await;
    app.write_file("docs/sub/b.txt", &sample(70)).await;
    app.write_file("other.txt", b"elsewhere").await;
    let token = app
        .download_share(&["docs/a.txt", "docs/sub/b.txt", "other.txt"])
        .await;
    let path = format!("/share/download/{token}?folder=docs");

    let full = app.fetch("GET", &path, None).await;
    assert_eq!(full.status, StatusCode::OK);
    assert_eq!(full.header("content-type"), Some("application/zip"));
    assert_eq!(
        full.header("content-length"),
        Some(full.bytes.len().to_string().as_str())
    );
    assert!(full.header("content-disposition").unwrap().contains("docs.zip"));
    assert_eq!(&full.bytes[..4], b"PK\x03\x04");
    assert_eq!(&full.bytes[full.bytes.len() - 22..][..4], b"PK\x05\x06");

    let total = full.bytes.len();
    let partial = app.fetch("GET", &path, Some("bytes=10-299")).await;
    assert_eq!(partial.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        partial.header("content-range"),
        Some(format!("bytes 10-299/{total}").as_str())
    );
    assert_eq!(partial.bytes.as_ref(), &full.bytes[10..300]);

    let tail_range = format!("bytes={}-", total - 30);
    let tail = app.fetch("GET", &path, Some(tail_range.as_str())).await;
    assert_eq!(tail.bytes.as_ref(), &full.bytes[total - 30..]);

    let head = app.fetch("HEAD", &path, None).await;
    assert_eq!(head.header("content-length"), Some(total.to_string().as_str()));
    assert_eq!(head.header("etag"), full.header("etag"));
}

#[tokio::test]
async fn test_whole_share_archive() {
    let app = helpers::TestApp::new().await;
    app.write_file("a.txt", b"a").await;
    let token = app.download_share(&["a.txt"]).await;

    let response = app
        .fetch("GET", &format!("/share/download/{token}?folder="), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(
        response
            .header("content-disposition")
            .unwrap()
            .contains("share-")
    );

    let missing = app
        .fetch("GET", &format!("/share/download/{token}?folder=nope"), None)
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleted_files_revoke_share() {
    let app = helpers::TestApp::new().await;
    app.write_file("gone.txt", b"bye").await;
    let token = app.download_share(&["gone.txt"]).await;
    std::fs::remove_file(app.file_path("gone.txt")).unwrap();

    let response = app
        .request("GET", &format!("/share/download/{token}"), None, None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["message"], "All shared files were removed.");

    let shares = app.admin("GET", "/api/admin/shares", None).await;
    assert_eq!(shares.body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let app = helpers::TestApp::new().await;
    let response = app
        .request("GET", "/share/download/unknown", None, None)
        .await;

    assert_eq!(response.header("x-frame-options"), Some("DENY"));
    assert_eq!(response.header("x-content-type-options"), Some("nosniff"));
    assert_eq!(response.header("referrer-policy"), Some("no-referrer"));
    assert!(response.header("content-security-policy").is_some());
    assert!(response.header("strict-transport-security").is_none());
}

#[tokio::test]
async fn test_hsts_when_secure() {
    let app = helpers::TestApp::with_config(|config| config.server.secure = true).await;
    let response = app.request("GET", "/api/health", None, None).await;
    assert!(response.header("strict-transport-security").is_some());
}
