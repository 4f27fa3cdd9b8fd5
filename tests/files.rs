//! tests/files.rs
//! Multipart uploads, listing and owner-scoped downloads.

#[path = "mod.rs"]
mod common;

use reqwest::{
    header::CONTENT_TYPE,
    multipart::{Form, Part},
    StatusCode,
};
use serde_json::Value;

fn upload_form(filename: &str, bytes: &[u8]) -> Form {
    Form::new().part("file", Part::bytes(bytes.to_vec()).file_name(filename.to_string()))
}

async fn upload(app: &common::TestApp, token: &str, form: Form) -> reqwest::Response {
    app.client
        .post(app.url("/file/upload"))
        .bearer_auth(token)
        .multipart(form)
        .send()
        .await
        .expect("Failed to upload")
}

#[tokio::test]
async fn upload_list_and_download_round_trip() {
    let app = common::spawn_app().await;
    let alice = app.signup("alice").await;
    let contents: &[u8] = b"meeting notes\nsecond line\n";

    let resp = upload(&app, &alice.access, upload_form("../../notes.txt", contents)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["filename"], "notes.txt");
    assert_eq!(body["data"]["content_type"], "text/plain");
    assert_eq!(body["data"]["size"], contents.len());
    let file_id: String = body["data"]["file_id"].as_str().unwrap().to_string();

    // Stored inside the upload directory only
    let stored: Vec<_> = std::fs::read_dir(&app.upload_dir).unwrap().collect();
    assert_eq!(stored.len(), 1);

    let body: Value = app.get_authed("/file/list", &alice.access).await.json().await.unwrap();
    assert_eq!(body["data"]["count"], 1);
    assert_eq!(body["data"]["files"][0]["file_id"], file_id.as_str());

    let resp = app.get_authed(&format!("/file/{file_id}"), &alice.access).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[CONTENT_TYPE], "text/plain");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), contents);
}

#[tokio::test]
async fn files_are_private_to_their_owner() {
    let app = common::spawn_app().await;
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;

    let resp = upload(&app, &alice.access, upload_form("report.csv", b"a,b\n1,2\n")).await;
    let body: Value = resp.json().await.unwrap();
    let file_id: &str = body["data"]["file_id"].as_str().unwrap();

    let resp = app.get_authed(&format!("/file/{file_id}"), &bob.access).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = app.get_authed("/file/list", &bob.access).await.json().await.unwrap();
    assert_eq!(body["data"]["count"], 0);
}

#[tokio::test]
async fn disallowed_or_empty_uploads_are_rejected() {
    let app = common::spawn_app().await;
    let alice = app.signup("alice").await;

    let resp = upload(&app, &alice.access, upload_form("payload.exe", b"MZ")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = upload(&app, &alice.access, upload_form("empty.txt", b"")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let form: Form = Form::new().text("comment", "no file here");
    let resp = upload(&app, &alice.access, form).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert_eq!(std::fs::read_dir(&app.upload_dir).unwrap().count(), 0);
}

#[tokio::test]
async fn malformed_file_ids_are_rejected() {
    let app = common::spawn_app().await;
    let alice = app.signup("alice").await;

    let resp = app.get_authed("/file/not-a-uuid", &alice.access).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
