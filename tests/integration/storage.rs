//! Storage file API against a mock storage service

use crate::integration::mock_server::{MockServerFixture, TEST_KEY};
use mockito::Matcher;
use serde_json::json;
use std::io::Write;
use supabase_core::transfer::channel_observer;
use supabase_core::{Error, FileOptions, TransferControl, TransferEvent, UploadState};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;

fn drain(rx: &mut UnboundedReceiver<TransferEvent>) -> (Vec<f32>, Vec<UploadState>) {
    let mut progress = Vec::new();
    let mut states = Vec::new();
    while let Ok(event) = rx.try_recv() {
        match event {
            TransferEvent::Progress(p) => progress.push(p),
            TransferEvent::State(s) => states.push(s),
        }
    }
    (progress, states)
}

fn assert_close(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len(), "progress: {actual:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 0.01, "progress: {actual:?}");
    }
}

#[tokio::test]
async fn upload_streams_body_and_reports_progress() {
    let mut fixture = MockServerFixture::new().await;
    let payload = "a".repeat(10_000);
    let mock = fixture
        .server
        .mock("POST", "/storage/v1/object/avatars/docs/readme.txt")
        .match_header("apikey", TEST_KEY)
        .match_header("cache-control", "max-age=3600")
        .match_header("content-type", "text/plain")
        .match_header("x-upsert", Matcher::Missing)
        .match_body(Matcher::Exact(payload.clone()))
        .with_status(200)
        .with_body(r#"{"Key":"avatars/docs/readme.txt"}"#)
        .create_async()
        .await;

    let client = fixture.client();
    let (observer, mut rx) = channel_observer();
    let control = TransferControl::new().observer(observer);
    let key = client
        .storage()
        .from("avatars")
        .upload(payload.into_bytes(), "docs/readme.txt", None, &control)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(key, "avatars/docs/readme.txt");

    let (progress, states) = drain(&mut rx);
    assert_close(&progress, &[40.96, 81.92, 100.0]);
    assert_eq!(states.first(), Some(&UploadState::PendingUpload));
    assert_eq!(states.last(), Some(&UploadState::Complete));
    assert!(states.windows(2).all(|w| w[0] <= w[1]), "states: {states:?}");
    assert!(states.contains(&UploadState::PendingResponse));
}

#[tokio::test]
async fn upsert_sets_header_and_explicit_content_type_wins() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("POST", "/storage/v1/object/avatars/me.png")
        .match_header("x-upsert", "true")
        .match_header("content-type", "application/octet-stream")
        .match_header("cache-control", "max-age=60")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let client = fixture.client();
    let options = FileOptions::default()
        .upsert(true)
        .cache_control(60)
        .content_type("application/octet-stream");
    client
        .storage()
        .from("avatars")
        .upload(vec![1u8, 2, 3], "me.png", Some(options), &TransferControl::new())
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn update_from_local_file_uses_default_content_type() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("POST", "/storage/v1/object/avatars/notes.json")
        .match_header("content-type", "text/plain;charset=UTF-8")
        .match_header("content-length", "11")
        .match_body("hello world")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let mut local = tempfile::NamedTempFile::new().unwrap();
    local.write_all(b"hello world").unwrap();
    local.flush().unwrap();

    let client = fixture.client();
    let key = client
        .storage()
        .from("avatars")
        .update(local.path(), "notes.json", None, &TransferControl::new())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(key, "avatars/notes.json");
}

#[tokio::test]
async fn failed_upload_never_reaches_complete() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture
        .server
        .mock("POST", "/storage/v1/object/avatars/dup.txt")
        .with_status(400)
        .with_body(r#"{"message":"The resource already exists","error":"Duplicate"}"#)
        .create_async()
        .await;

    let client = fixture.client();
    let (observer, mut rx) = channel_observer();
    let control = TransferControl::new().observer(observer);
    let err = client
        .storage()
        .from("avatars")
        .upload(b"dup".to_vec(), "dup.txt", None, &control)
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(400));
    match err {
        Error::Request(e) => assert_eq!(e.message(), "The resource already exists"),
        other => panic!("unexpected error: {other:?}"),
    }
    let (_, states) = drain(&mut rx);
    assert!(!states.contains(&UploadState::Complete));
}

#[tokio::test]
async fn empty_upload_still_walks_every_state() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("POST", "/storage/v1/object/avatars/empty.txt")
        .match_header("content-length", "0")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let client = fixture.client();
    let (observer, mut rx) = channel_observer();
    let control = TransferControl::new().observer(observer);
    client
        .storage()
        .from("avatars")
        .upload(Vec::<u8>::new(), "empty.txt", None, &control)
        .await
        .unwrap();

    mock.assert_async().await;
    let (progress, states) = drain(&mut rx);
    assert!(progress.is_empty());
    assert_eq!(
        states,
        vec![
            UploadState::PendingUpload,
            UploadState::PendingResponse,
            UploadState::Complete,
        ]
    );
}

#[tokio::test]
async fn upload_cancelled_before_start_is_cancelled_error() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture
        .server
        .mock("POST", "/storage/v1/object/avatars/big.bin")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let token = CancellationToken::new();
    token.cancel();
    let (observer, mut rx) = channel_observer();
    let control = TransferControl::new().observer(observer).cancel_token(token);

    let client = fixture.client();
    let err = client
        .storage()
        .from("avatars")
        .upload(vec![0u8; 10_000], "big.bin", None, &control)
        .await
        .unwrap_err();

    assert!(err.is_cancelled(), "unexpected error: {err:?}");
    assert!(matches!(err, Error::Cancelled { bytes_transferred: 0 }));
    let (_, states) = drain(&mut rx);
    assert!(!states.contains(&UploadState::Complete));
}

#[tokio::test]
async fn upload_cancelled_mid_transfer_reports_sent_bytes() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture
        .server
        .mock("POST", "/storage/v1/object/avatars/big.bin")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let token = CancellationToken::new();
    let cancel = token.clone();
    let control = TransferControl::new()
        .on_progress(move |_| cancel.cancel())
        .cancel_token(token);

    let client = fixture.client();
    let err = client
        .storage()
        .from("avatars")
        .upload(vec![0u8; 20_000], "big.bin", None, &control)
        .await
        .unwrap_err();

    match err {
        Error::Cancelled { bytes_transferred } => assert_eq!(bytes_transferred, 4096),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn download_reports_progress_up_to_100() {
    let mut fixture = MockServerFixture::new().await;
    let body = vec![7u8; 200_000];
    let _mock = fixture
        .server
        .mock("GET", "/storage/v1/object/videos/clip.bin")
        .with_status(200)
        .with_body(body.clone())
        .create_async()
        .await;

    let client = fixture.client();
    let (observer, mut rx) = channel_observer();
    let control = TransferControl::new().observer(observer);
    let data = client
        .storage()
        .from("videos")
        .download("clip.bin", &control)
        .await
        .unwrap();

    assert_eq!(data.len(), 200_000);
    assert_eq!(&data[..], &body[..]);
    let (progress, _) = drain(&mut rx);
    assert!(!progress.is_empty());
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert!((progress[progress.len() - 1] - 100.0).abs() < f32::EPSILON);
}

#[tokio::test]
async fn download_without_content_length_skips_progress() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture
        .server
        .mock("GET", "/storage/v1/object/videos/live.bin")
        .with_status(200)
        .with_chunked_body(|w| {
            w.write_all(&[5u8; 60_000])?;
            w.write_all(&[6u8; 60_000])
        })
        .create_async()
        .await;

    let client = fixture.client();
    let (observer, mut rx) = channel_observer();
    let control = TransferControl::new().observer(observer);
    let data = client
        .storage()
        .from("videos")
        .download("live.bin", &control)
        .await
        .unwrap();

    assert_eq!(data.len(), 120_000);
    assert!(data[..60_000].iter().all(|b| *b == 5));
    assert!(data[60_000..].iter().all(|b| *b == 6));
    let (progress, _) = drain(&mut rx);
    assert!(progress.is_empty(), "progress: {progress:?}");
}

#[tokio::test]
async fn download_to_writes_local_file() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture
        .server
        .mock("GET", "/storage/v1/object/docs/a/b.txt")
        .with_status(200)
        .with_body("file contents")
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("b.txt");
    std::fs::write(&target, "older and much longer contents").unwrap();

    let client = fixture.client();
    let written = client
        .storage()
        .from("docs")
        .download_to("a/b.txt", &target, &TransferControl::new())
        .await
        .unwrap();

    assert_eq!(written, target);
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "file contents");
}

#[tokio::test]
async fn download_missing_object_is_request_error() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture
        .server
        .mock("GET", "/storage/v1/object/docs/missing.txt")
        .with_status(404)
        .with_body(r#"{"message":"Object not found","statusCode":"404"}"#)
        .create_async()
        .await;

    let client = fixture.client();
    let err = client
        .storage()
        .from("docs")
        .download("missing.txt", &TransferControl::new())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn cancelled_download_stops_with_cancelled_error() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture
        .server
        .mock("GET", "/storage/v1/object/videos/big.bin")
        .with_status(200)
        .with_body(vec![0u8; 4096])
        .create_async()
        .await;

    let token = CancellationToken::new();
    token.cancel();
    let control = TransferControl::new().cancel_token(token);

    let client = fixture.client();
    let err = client
        .storage()
        .from("videos")
        .download("big.bin", &control)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
}

#[tokio::test]
async fn list_sends_search_options_with_prefix() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("POST", "/storage/v1/object/list/avatars")
        .match_body(Matcher::Json(json!({
            "limit": 100,
            "offset": 0,
            "sortBy": {"column": "name", "order": "asc"},
            "prefix": "images/"
        })))
        .with_status(200)
        .with_body(
            r#"[
                {"name":"cat.png","id":"f1","bucket_id":"avatars","metadata":{"size":12}},
                {"name":"thumbs","id":null}
            ]"#,
        )
        .create_async()
        .await;

    let client = fixture.client();
    let files = client
        .storage()
        .from("avatars")
        .list("images/", None)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].name, "cat.png");
    assert!(!files[0].is_folder());
    assert!(files[1].is_folder());
}

#[tokio::test]
async fn move_object_reports_outcome_as_bool() {
    let mut fixture = MockServerFixture::new().await;
    let ok = fixture
        .server
        .mock("POST", "/storage/v1/object/move")
        .match_body(Matcher::Json(json!({
            "bucketId": "avatars",
            "sourceKey": "old.png",
            "destinationKey": "new.png"
        })))
        .with_status(200)
        .with_body(r#"{"message":"Successfully moved"}"#)
        .create_async()
        .await;

    let client = fixture.client();
    let bucket = client.storage().from("avatars");
    assert!(bucket.move_object("old.png", "new.png").await);
    ok.assert_async().await;

    let _missing = fixture
        .server
        .mock("POST", "/storage/v1/object/move")
        .match_body(Matcher::PartialJson(json!({"sourceKey": "ghost.png"})))
        .with_status(404)
        .with_body(r#"{"message":"Object not found"}"#)
        .create_async()
        .await;

    assert!(!bucket.move_object("ghost.png", "new.png").await);
    let err = bucket.try_move_object("ghost.png", "new.png").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn move_with_empty_success_body_counts_as_moved() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture
        .server
        .mock("POST", "/storage/v1/object/move")
        .with_status(200)
        .with_body("")
        .expect(2)
        .create_async()
        .await;

    let client = fixture.client();
    let bucket = client.storage().from("avatars");
    assert!(bucket.move_object("a/x.png", "a/y.png").await);
    bucket.try_move_object("a/x.png", "a/y.png").await.unwrap();
}

#[tokio::test]
async fn remove_sends_prefixes() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("DELETE", "/storage/v1/object/avatars")
        .match_body(Matcher::Json(json!({"prefixes": ["a.png", "b/c.png"]})))
        .with_status(200)
        .with_body(r#"[{"name":"a.png"},{"name":"b/c.png"}]"#)
        .create_async()
        .await;

    let client = fixture.client();
    let removed = client
        .storage()
        .from("avatars")
        .remove(["a.png", "b/c.png"])
        .await
        .unwrap();

    mock.assert_async().await;
    let names: Vec<_> = removed.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["a.png", "b/c.png"]);
}

#[tokio::test]
async fn signed_urls_are_made_absolute() {
    let mut fixture = MockServerFixture::new().await;
    let single = fixture
        .server
        .mock("POST", "/storage/v1/object/sign/avatars/me.png")
        .match_body(Matcher::Json(json!({"expiresIn": 60})))
        .with_status(200)
        .with_body(r#"{"signedURL":"/object/sign/avatars/me.png?token=abc"}"#)
        .create_async()
        .await;
    let batch = fixture
        .server
        .mock("POST", "/storage/v1/object/sign/avatars")
        .match_body(Matcher::Json(json!({"expiresIn": 120, "paths": ["a.png", "nope.png"]})))
        .with_status(200)
        .with_body(
            r#"[
                {"path":"a.png","signedURL":"/object/sign/avatars/a.png?token=t1","error":null},
                {"path":"nope.png","signedURL":null,"error":"Either the object does not exist or you do not have access to it"}
            ]"#,
        )
        .create_async()
        .await;

    let client = fixture.client();
    let bucket = client.storage().from("avatars");
    let storage_url = fixture.storage_url();

    let url = bucket.create_signed_url("me.png", 60).await.unwrap();
    assert_eq!(url, format!("{storage_url}/object/sign/avatars/me.png?token=abc"));

    let urls = bucket.create_signed_urls(["a.png", "nope.png"], 120).await.unwrap();
    assert_eq!(
        urls[0].signed_url.as_deref(),
        Some(format!("{storage_url}/object/sign/avatars/a.png?token=t1").as_str())
    );
    assert!(urls[1].signed_url.is_none());
    assert!(urls[1].error.is_some());

    single.assert_async().await;
    batch.assert_async().await;
}

#[tokio::test]
async fn public_url_needs_no_request() {
    let fixture = MockServerFixture::new().await;
    let client = fixture.client();
    let url = client.storage().from("public-assets").get_public_url("img/logo.svg");
    assert_eq!(
        url,
        format!("{}/object/public/public-assets/img/logo.svg", fixture.storage_url())
    );
}
