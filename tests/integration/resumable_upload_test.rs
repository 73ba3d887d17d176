//! Integration tests for upload shares: resumable chunks, quotas, and
//! multipart batches.

mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};

fn sample(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 256) as u8).collect()
}

/// POST one chunk `data[start..=end]` of `data`.
async fn send_chunk(
    app: &helpers::TestApp,
    token: &str,
    upload_id: &str,
    name: &str,
    data: &[u8],
    start: usize,
    end: usize,
) -> helpers::TestResponse {
    let req = Request::builder()
        .method("POST")
        .uri(format!("/share/upload/{token}"))
        .header("X-Upload-Id", upload_id)
        .header("X-File-Size", data.len().to_string())
        .header("X-File-Name", name)
        .header("X-File-Type", "application/octet-stream")
        .header("X-File-Last-Modified", "1700000000000")
        .header(
            "Content-Range",
            format!("bytes {start}-{end}/{}", data.len()),
        )
        .body(Body::from(data[start..=end].to_vec()))
        .unwrap();
    app.send(req).await
}

/// POST a whole file as a single request without `Content-Range`.
async fn send_whole(
    app: &helpers::TestApp,
    token: &str,
    upload_id: &str,
    name: &str,
    data: &[u8],
) -> helpers::TestResponse {
    let req = Request::builder()
        .method("POST")
        .uri(format!("/share/upload/{token}"))
        .header("X-Upload-Id", upload_id)
        .header("X-File-Size", data.len().to_string())
        .header("X-File-Name", name)
        .body(Body::from(data.to_vec()))
        .unwrap();
    app.send(req).await
}

#[tokio::test]
async fn test_chunked_upload_with_retransmit() {
    let app = helpers::TestApp::new().await;
    let token = app.upload_share("inbox", None).await;
    let data = sample(2500);

    let first = send_chunk(&app, &token, "up-1", "report.bin", &data, 0, 999).await;
    assert_eq!(first.status, StatusCode::NO_CONTENT);
    assert_eq!(first.header("upload-offset"), Some("1000"));
    assert_eq!(first.header("upload-length"), Some("1000"));

    let second = send_chunk(&app, &token, "up-1", "report.bin", &data, 1000, 1999).await;
    assert_eq!(second.status, StatusCode::NO_CONTENT);
    assert_eq!(second.header("upload-offset"), Some("2000"));

    // The client lost the reply and sends the same chunk again.
    let repeat = send_chunk(&app, &token, "up-1", "report.bin", &data, 1000, 1999).await;
    assert_eq!(repeat.status, StatusCode::NO_CONTENT);
    assert_eq!(repeat.header("upload-length"), Some("2000"));

    let last = send_chunk(&app, &token, "up-1", "report.bin", &data, 2000, 2499).await;
    assert_eq!(last.status, StatusCode::OK);
    assert_eq!(last.body["completed"], false);
    assert!(last.body["message"].as_str().unwrap().contains("report.bin"));

    let stored = std::fs::read(app.file_path("inbox/report.bin")).unwrap();
    assert_eq!(stored, data);
    assert!(!app.resumable_root().join(&token).join("up-1").exists());
}

#[tokio::test]
async fn test_gap_is_conflict_with_expected_offset() {
    let app = helpers::TestApp::new().await;
    let token = app.upload_share("inbox", None).await;
    let data = sample(300);

    send_chunk(&app, &token, "gap", "g.bin", &data, 0, 99).await;
    let response = send_chunk(&app, &token, "gap", "g.bin", &data, 200, 299).await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["message"], "Unexpected chunk offset.");
    assert_eq!(response.body["details"]["expected_offset"], 100);

    let resumed = send_chunk(&app, &token, "gap", "g.bin", &data, 100, 299).await;
    assert_eq!(resumed.status, StatusCode::OK);
    assert_eq!(std::fs::read(app.file_path("inbox/g.bin")).unwrap(), data);
}

#[tokio::test]
async fn test_chunk_past_declared_size_is_rejected() {
    let app = helpers::TestApp::new().await;
    let token = app.upload_share("inbox", Some(10)).await;

    let req = Request::builder()
        .method("POST")
        .uri(format!("/share/upload/{token}"))
        .header("X-Upload-Id", "over")
        .header("X-File-Size", "10")
        .header("X-File-Name", "over.bin")
        .header("Content-Range", "bytes 0-999/10")
        .body(Body::from(vec![0u8; 1000]))
        .unwrap();
    let response = app.send(req).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Chunk size mismatch.");
    assert!(!app.resumable_root().join(&token).join("over").exists());
}

#[tokio::test]
async fn test_relative_path_and_name_collision() {
    let app = helpers::TestApp::new().await;
    let token = app.upload_share("inbox", None).await;
    app.write_file("inbox/photos/cat.jpg", b"existing").await;

    let req = Request::builder()
        .method("POST")
        .uri(format!("/share/upload/{token}"))
        .header("X-Upload-Id", "rel")
        .header("X-File-Size", "3")
        .header("X-File-Name", "cat.jpg")
        .header("X-File-Relative-Path", "photos%2Fcat.jpg")
        .body(Body::from("new"))
        .unwrap();
    let response = app.send(req).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        std::fs::read(app.file_path("inbox/photos/cat (1).jpg")).unwrap(),
        b"new"
    );
    assert_eq!(
        std::fs::read(app.file_path("inbox/photos/cat.jpg")).unwrap(),
        b"existing"
    );
}

#[tokio::test]
async fn test_quota_rejects_then_closes_share() {
    let app = helpers::TestApp::new().await;
    let token = app.upload_share("inbox", Some(1000)).await;

    let first = send_whole(&app, &token, "a", "a.bin", &sample(600)).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["completed"], false);

    let second = send_whole(&app, &token, "b", "b.bin", &sample(600)).await;
    assert_eq!(second.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(!app.file_path("inbox/b.bin").exists());

    let info = app
        .request("GET", &format!("/share/upload/{token}"), None, None)
        .await;
    assert_eq!(info.body["remaining_bytes"], 400);

    let last = send_whole(&app, &token, "c", "c.bin", &sample(400)).await;
    assert_eq!(last.status, StatusCode::OK);
    assert_eq!(last.body["completed"], true);

    let closed = app
        .request("GET", &format!("/share/upload/{token}"), None, None)
        .await;
    assert_eq!(closed.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_headers_are_rejected() {
    let app = helpers::TestApp::new().await;
    let token = app.upload_share("inbox", None).await;

    let req = Request::builder()
        .method("POST")
        .uri(format!("/share/upload/{token}"))
        .header("X-Upload-Id", "../")
        .header("X-File-Size", "3")
        .body(Body::from("abc"))
        .unwrap();
    let response = app.send(req).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Missing upload identifier.");

    let req = Request::builder()
        .method("POST")
        .uri(format!("/share/upload/{token}"))
        .header("X-Upload-Id", "ok")
        .header("X-File-Size", "10")
        .body(Body::from("abc"))
        .unwrap();
    let response = app.send(req).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Missing content range metadata.");
}

#[tokio::test]
async fn test_multipart_batch_skips_hidden_files() {
    let app = helpers::TestApp::new().await;
    let token = app.upload_share("drop", Some(10_000)).await;

    let (content_type, body) = helpers::multipart_body(
        &[],
        &[("notes.txt", b"notes"), (".DS_Store", b"junk"), ("b.txt", b"bee")],
    );
    let req = Request::builder()
        .method("POST")
        .uri(format!("/share/upload/{token}"))
        .header("Content-Type", content_type)
        .body(Body::from(body))
        .unwrap();
    let response = app.send(req).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(
        response.body["message"]
            .as_str()
            .unwrap()
            .contains("Skipped 1 hidden file")
    );
    assert_eq!(std::fs::read(app.file_path("drop/notes.txt")).unwrap(), b"notes");
    assert!(!app.file_path("drop/.DS_Store").exists());

    let info = app
        .request("GET", &format!("/share/upload/{token}"), None, None)
        .await;
    assert_eq!(info.body["uploaded_bytes"], 8);
}

#[tokio::test]
async fn test_unknown_upload_token() {
    let app = helpers::TestApp::new().await;
    let response = send_whole(&app, "missing", "x", "x.bin", b"x").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["message"], "Upload share not found or expired.");
}
