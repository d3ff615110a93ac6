//! HTTP transport against a mock server.

use std::time::Duration;

use chrono::{DateTime, Utc};
use repsync::features::sync::{EntryId, Operation, WorkoutLog};
use repsync::features::transport::{
    FailureClass, HttpTransport, SendError, WriteRequest, WriteTransport,
};
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(id: &str) -> WriteRequest {
    let queued_at = DateTime::parse_from_rfc3339("2024-05-01T08:00:00Z")
        .unwrap()
        .with_timezone(&Utc);
    WriteRequest::new(
        EntryId::from(id),
        Operation::LogWorkout(WorkoutLog::new("squats", 15).with_sets(3)),
        queued_at,
    )
}

async fn transport(server: &MockServer) -> HttpTransport {
    HttpTransport::new(
        format!("{}/api/workouts", server.uri()),
        Duration::from_millis(500),
    )
    .unwrap()
}

#[tokio::test]
async fn sends_key_token_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/workouts"))
        .and(header("Idempotency-Key", "w1"))
        .and(header("Authorization", "Bearer abc"))
        .and(body_json(serde_json::json!({
            "type": "squats",
            "amount": 15,
            "sets": 3,
            "queued_at": "2024-05-01T08:00:00Z"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"xp": 15})))
        .expect(1)
        .mount(&server)
        .await;

    let response = transport(&server)
        .await
        .send(&request("w1"), Some("abc"))
        .await
        .unwrap();

    assert_eq!(response.status, 201);
    assert_eq!(response.body, serde_json::json!({"xp": 15}));
}

#[tokio::test]
async fn omits_authorization_without_token() {
    let server = MockServer::start().await;
    Mock::given(header_exists("Authorization"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let response = transport(&server)
        .await
        .send(&request("w1"), None)
        .await
        .unwrap();
    assert_eq!(response.status, 204);
    assert_eq!(response.body, serde_json::Value::Null);
}

#[tokio::test]
async fn classifies_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(serde_json::json!({"error": "amount must be positive"})),
        )
        .mount(&server)
        .await;

    let err = transport(&server)
        .await
        .send(&request("w2"), None)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        SendError::Rejected {
            status: 422,
            message: "amount must be positive".to_string()
        }
    );
    assert_eq!(err.class(), FailureClass::Permanent);
}

#[tokio::test]
async fn classifies_server_errors_and_throttling_as_transient() {
    for status in [500_u16, 503, 429, 408] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        let err = transport(&server)
            .await
            .send(&request("w3"), None)
            .await
            .unwrap_err();
        assert_eq!(
            err.class(),
            FailureClass::Transient,
            "status {status} should be transient"
        );
    }
}

#[tokio::test]
async fn classifies_unauthorized_as_credential_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .mount(&server)
        .await;

    let err = transport(&server)
        .await
        .send(&request("w4"), Some("old"))
        .await
        .unwrap_err();
    assert_eq!(err, SendError::Unauthorized("token expired".to_string()));
    assert_eq!(err.class(), FailureClass::Credential);
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let err = transport(&server)
        .await
        .send(&request("w5"), None)
        .await
        .unwrap_err();
    assert_eq!(err, SendError::Timeout);
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    let transport = HttpTransport::new("http://127.0.0.1:1/api/workouts", Duration::from_secs(2))
        .unwrap();

    let err = transport.send(&request("w6"), None).await.unwrap_err();
    assert_eq!(err.class(), FailureClass::Transient);
}
