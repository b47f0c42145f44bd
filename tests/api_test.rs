//! Integration tests for the HTTP surface.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

use helpers::TestApp;

#[tokio::test]
async fn test_health_reports_bridge() {
    let app = TestApp::new();
    let response = app.request("GET", "/", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "online");
    assert_eq!(response.body["bridge"], "configured");
}

#[tokio::test]
async fn test_upload_then_list_and_stats() {
    let app = TestApp::new();

    let created = app
        .request(
            "POST",
            "/folder/create",
            Some(json!({ "owner": "alice", "name": "docs" })),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let folder_id = created.body["data"]["id"].as_str().unwrap().to_string();

    let uploaded = app
        .upload("alice", Some(&folder_id), "local", "notes.txt", "text/plain", b"hello")
        .await;
    assert_eq!(uploaded.status, StatusCode::CREATED);
    assert_eq!(uploaded.body["location"], "local");
    assert_eq!(uploaded.body["path"], "docs/notes.txt");
    assert!(app.bridge.contains("docs/notes.txt").await);

    let content = app
        .request(
            "GET",
            &format!("/content?owner=alice&folder_id={folder_id}"),
            None,
        )
        .await;
    assert_eq!(content.status, StatusCode::OK);
    let files = content.body["data"]["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["original_name"], "notes.txt");
    assert_eq!(files[0]["available"], true);
    assert_eq!(files[0]["disk_size"], 5);

    let stats = app.request("GET", "/stats?uid_user=alice", None).await;
    assert_eq!(stats.status, StatusCode::OK);
    assert_eq!(stats.body["data"]["file_count"], 1);
    assert_eq!(stats.body["data"]["by_category"]["text"]["size"], 5);
}

#[tokio::test]
async fn test_upload_downgrades_when_bridge_is_down() {
    let app = TestApp::new();
    app.bridge.set_alive(false);

    let uploaded = app
        .upload("alice", None, "local", "photo.png", "image/png", b"png")
        .await;
    assert_eq!(uploaded.status, StatusCode::CREATED);
    assert_eq!(uploaded.body["requested"], "local");
    assert_eq!(uploaded.body["location"], "cloud");
    assert_eq!(app.cloud.keys().await.len(), 1);
}

#[tokio::test]
async fn test_duplicate_upload_conflicts() {
    let app = TestApp::new();
    app.upload("alice", None, "cloud", "a.txt", "text/plain", b"1")
        .await;
    let second = app
        .upload("alice", None, "cloud", "a.txt", "text/plain", b"2")
        .await;

    assert_eq!(second.status, StatusCode::CONFLICT);
    assert_eq!(second.body["error"], "CONFLICT");
    assert_eq!(app.cloud.keys().await.len(), 1);
}

#[tokio::test]
async fn test_upload_requires_owner() {
    let app = TestApp::new();
    let response = app
        .upload("  ", None, "local", "a.txt", "text/plain", b"1")
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_download_routes() {
    let app = TestApp::new();
    app.upload("alice", None, "local", "small.bin", "application/octet-stream", b"bytes")
        .await;
    app.upload("alice", None, "cloud", "remote.bin", "application/octet-stream", b"bytes")
        .await;

    let proxied = app
        .request("GET", "/download?owner=alice&file_name=small.bin", None)
        .await;
    assert_eq!(proxied.status, StatusCode::OK);
    assert_eq!(proxied.bytes, b"bytes");

    app.bridge
        .report_size("small.bin", Some(50 * 1024 * 1024))
        .await;
    let redirected = app
        .request("GET", "/download?owner=alice&file_name=small.bin", None)
        .await;
    assert_eq!(redirected.status, StatusCode::FOUND);
    assert!(
        redirected
            .location
            .unwrap()
            .ends_with("/api/bridge/download/small.bin")
    );

    let signed = app
        .request("GET", "/download?owner=alice&fileName=remote.bin", None)
        .await;
    assert_eq!(signed.status, StatusCode::FOUND);
    assert!(signed.location.unwrap().contains("X-Amz-Expires="));
}

#[tokio::test]
async fn test_download_with_bridge_offline_is_not_found() {
    let app = TestApp::new();
    app.upload("alice", None, "local", "a.bin", "application/octet-stream", b"x")
        .await;
    app.bridge.set_alive(false);

    let response = app
        .request("GET", "/download?owner=alice&file_name=a.bin", None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_remove_reports_each_case() {
    let app = TestApp::new();
    app.upload("alice", None, "local", "a.txt", "text/plain", b"x")
        .await;

    let removed = app
        .request(
            "DELETE",
            "/remove",
            Some(json!({ "owner": "alice", "file_name": "a.txt" })),
        )
        .await;
    assert_eq!(removed.status, StatusCode::OK);
    assert_eq!(removed.body["outcome"], "removed");

    let again = app
        .request(
            "DELETE",
            "/remove",
            Some(json!({ "owner": "alice", "file_name": "a.txt", "location": "local" })),
        )
        .await;
    assert_eq!(again.status, StatusCode::OK);
    assert_eq!(again.body["outcome"], "nothing_to_remove");
}

#[tokio::test]
async fn test_remove_with_bridge_offline_keeps_record() {
    let app = TestApp::new();
    app.upload("alice", None, "local", "a.txt", "text/plain", b"x")
        .await;
    app.bridge.set_alive(false);

    let response = app
        .request(
            "DELETE",
            "/remove",
            Some(json!({ "owner": "alice", "file_name": "a.txt" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(app.store.file_count().await, 1);
}

#[tokio::test]
async fn test_sync_add_created_then_existing() {
    let app = TestApp::new();
    let event = json!({
        "uid_user": "alice",
        "fileName": "x.txt",
        "filePath": "inbox",
        "size": 10
    });

    let first = app.request("POST", "/sync-add", Some(event.clone())).await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(first.body["data"]["folder_id"], serde_json::Value::Null);

    let second = app.request("POST", "/sync-add", Some(event)).await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.body["message"], "file already registered");
    assert_eq!(app.store.file_count().await, 1);
}

#[tokio::test]
async fn test_out_of_order_folder_events_converge() {
    let app = TestApp::new();

    let folder = app
        .request(
            "POST",
            "/sync-folder",
            Some(json!({ "owner": "alice", "name": "b", "parent": "a" })),
        )
        .await;
    assert_eq!(folder.status, StatusCode::OK);
    assert_eq!(folder.body["data"]["outcome"], "created");

    app.request(
        "POST",
        "/sync-add",
        Some(json!({ "owner": "alice", "file_name": "f.txt", "folder_path": "a/b", "size": 1 })),
    )
    .await;

    let removed = app
        .request(
            "POST",
            "/sync-remove-folder",
            Some(json!({ "owner": "alice", "name": "a" })),
        )
        .await;
    assert_eq!(removed.status, StatusCode::OK);
    assert_eq!(removed.body["outcome"], "removed");

    // The file's own event arrives after its ancestor is gone.
    let late = app
        .request(
            "POST",
            "/sync-remove",
            Some(json!({ "owner": "alice", "file_name": "f.txt", "folder_path": "a/b" })),
        )
        .await;
    assert_eq!(late.status, StatusCode::OK);
    assert_eq!(late.body["success"], true);
    assert_eq!(late.body["outcome"], "folder_gone");

    let replay = app
        .request(
            "POST",
            "/sync-remove-folder",
            Some(json!({ "owner": "alice", "name": "a" })),
        )
        .await;
    assert_eq!(replay.status, StatusCode::OK);
    assert_eq!(replay.body["outcome"], "already_absent");
}

#[tokio::test]
async fn test_delete_folder_cascades() {
    let app = TestApp::new();
    let created = app
        .request(
            "POST",
            "/folder/create",
            Some(json!({ "owner": "alice", "name": "docs" })),
        )
        .await;
    let folder_id = created.body["data"]["id"].as_str().unwrap().to_string();
    app.upload("alice", Some(&folder_id), "cloud", "a.txt", "text/plain", b"x")
        .await;

    let response = app
        .request(
            "DELETE",
            "/folder",
            Some(json!({ "owner": "alice", "folder_id": folder_id })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["folders"], 1);
    assert_eq!(response.body["data"]["files"], 1);
    assert_eq!(app.store.file_count().await, 0);
}
