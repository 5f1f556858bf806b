//! Integration tests for the service client against a mock HTTP server.

use std::io::Write;
use std::sync::{Arc, Mutex};

use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use csift_client::{ApiClient, ClientConfig, ClientError};
use csift_models::{JobId, RemoteStatus, SubmitOptions, UsagePayload};

fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(ClientConfig {
        base_url: server.uri(),
        bearer_token: Some("secret-token".to_string()),
        ..ClientConfig::default()
    })
    .unwrap()
}

fn temp_media_file(bytes: usize) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&vec![0x42u8; bytes]).unwrap();
    file.flush().unwrap();
    file
}

#[tokio::test]
async fn submit_returns_job_id_and_reports_progress() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/process"))
        .and(header("authorization", "Bearer secret-token"))
        .and(body_string_contains("mute"))
        .and(body_string_contains("en,es"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "job_id": "abc123"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let file = temp_media_file(200 * 1024);
    let seen: Arc<Mutex<Vec<(u64, u64)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let options = SubmitOptions {
        languages: vec!["en".to_string(), "es".to_string()],
        ..SubmitOptions::default()
    };

    let job_id = client_for(&server)
        .submit(
            file.path(),
            "clip.mp4",
            Some("video/mp4"),
            &options,
            Some(Arc::new(move |sent, total| {
                sink.lock().unwrap().push((sent, total));
            })),
        )
        .await
        .unwrap();

    assert_eq!(job_id.as_str(), "abc123");

    let updates = seen.lock().unwrap();
    assert!(!updates.is_empty());
    let total = 200 * 1024u64;
    assert_eq!(updates.last().unwrap(), &(total, total));
    // Byte counts only ever grow
    assert!(updates.windows(2).all(|w| w[0].0 <= w[1].0));
}

#[tokio::test]
async fn submit_accepts_http_202() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/process"))
        .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({
            "job_id": "queued-77"
        })))
        .mount(&server)
        .await;

    let file = temp_media_file(1024);
    let job_id = client_for(&server)
        .submit(file.path(), "clip.mp4", None, &SubmitOptions::default(), None)
        .await
        .unwrap();

    assert_eq!(job_id.as_str(), "queued-77");
}

#[tokio::test]
async fn submit_rejection_carries_status_and_server_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/process"))
        .respond_with(ResponseTemplate::new(413).set_body_json(serde_json::json!({
            "error": "file exceeds the 500MB plan limit"
        })))
        .mount(&server)
        .await;

    let file = temp_media_file(1024);
    let err = client_for(&server)
        .submit(file.path(), "clip.mp4", None, &SubmitOptions::default(), None)
        .await
        .unwrap_err();

    match &err {
        ClientError::Status { status, message } => {
            assert_eq!(status.as_u16(), 413);
            assert_eq!(message, "file exceeds the 500MB plan limit");
        }
        other => panic!("expected status error, got {other:?}"),
    }
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn submit_rejection_without_body_uses_reason_phrase() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/process"))
        .respond_with(ResponseTemplate::new(413))
        .mount(&server)
        .await;

    let file = temp_media_file(1024);
    let err = client_for(&server)
        .submit(file.path(), "clip.mp4", None, &SubmitOptions::default(), None)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Payload Too Large"));
}

#[tokio::test]
async fn job_status_parses_poll_response() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/status/abc123"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "processing",
            "progress": 35.0
        })))
        .mount(&server)
        .await;

    let status = client_for(&server)
        .job_status(&JobId::from_string("abc123"))
        .await
        .unwrap();

    assert_eq!(status.status, RemoteStatus::Processing);
    assert_eq!(status.progress, Some(35.0));
    assert!(status.download_url.is_none());
}

#[tokio::test]
async fn job_status_surfaces_server_errors_as_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/status/abc123"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .job_status(&JobId::from_string("abc123"))
        .await
        .unwrap_err();

    assert!(err.is_retryable());
}

#[tokio::test]
async fn usage_decodes_known_and_unknown_shapes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/usage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "usage": {"current": 4, "limit": 10}
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/usage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "plan": "pro"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);

    let snap = client.usage().await.unwrap().snapshot();
    assert_eq!(snap.consumed, 4);
    assert_eq!(snap.limit, Some(10));

    let payload = client.usage().await.unwrap();
    assert!(matches!(payload, UsagePayload::Unknown(_)));
    assert_eq!(payload.snapshot().limit, None);
}

#[tokio::test]
async fn download_returns_artifact_bytes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/download/abc123"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"processed-media".to_vec()))
        .mount(&server)
        .await;

    let bytes = client_for(&server)
        .download(&JobId::from_string("abc123"))
        .await
        .unwrap();

    assert_eq!(bytes.as_ref(), b"processed-media");
}

#[tokio::test]
async fn download_failure_is_an_error_not_empty_bytes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/download/abc123"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "detail": "artifact expired"
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .download(&JobId::from_string("abc123"))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("artifact expired"));
}

#[tokio::test]
async fn no_authorization_header_without_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/usage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "current": 0, "limit": 10
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).with_bearer(None);
    client.usage().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0]
        .headers
        .iter()
        .any(|(name, _)| name.as_str().eq_ignore_ascii_case("authorization")));
}
