#![allow(clippy::unwrap_used)]
// Integration tests for `VeeamClient` using wiremock.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use veeamly_api::{ApiVersion, Error, ExtentMode, TokenGrant, VeeamClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, VeeamClient) {
    setup_with(ApiVersion::default()).await
}

async fn setup_with(version: ApiVersion) -> (MockServer, VeeamClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = VeeamClient::with_client(reqwest::Client::new(), base_url, version);
    (server, client)
}

fn token() -> SecretString {
    "access-abc".to_string().into()
}

fn password_grant(password: &str) -> TokenGrant {
    TokenGrant::Password {
        username: "administrator".into(),
        password: password.to_string().into(),
    }
}

// ── Token tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_password_grant_success() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/oauth2/token"))
        .and(header("x-api-version", "1.3-rev1"))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("username=administrator"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "token_type": "bearer",
            "expires_in": 900
        })))
        .expect(1)
        .mount(&server)
        .await;

    let token = client.request_token(&password_grant("s3cret")).await.unwrap();

    assert_eq!(token.access_token.expose_secret(), "access-1");
    assert_eq!(
        token.refresh_token.as_ref().map(|t| t.expose_secret()),
        Some("refresh-1")
    );
    assert_eq!(token.expires_in, Some(900));
}

#[tokio::test]
async fn test_refresh_grant_without_expiry() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/oauth2/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "access_token": "access-2" })),
        )
        .mount(&server)
        .await;

    let grant = TokenGrant::RefreshToken("refresh-1".to_string().into());
    let token = client.request_token(&grant).await.unwrap();

    assert_eq!(token.access_token.expose_secret(), "access-2");
    assert!(token.refresh_token.is_none());
    assert!(token.expires_in.is_none());
}

#[tokio::test]
async fn test_password_grant_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/oauth2/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "errorCode": "Unauthorized",
            "message": "Invalid username or password"
        })))
        .mount(&server)
        .await;

    let result = client.request_token(&password_grant("wrong")).await;

    match result {
        Err(Error::Authentication { message }) => {
            assert_eq!(message, "Invalid username or password");
        }
        other => panic!("expected Authentication error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    // Nothing listens on the discard port.
    let base_url = Url::parse("http://127.0.0.1:9").unwrap();
    let client = VeeamClient::with_client(reqwest::Client::new(), base_url, ApiVersion::default());

    let result = client.request_token(&password_grant("pw")).await;
    assert!(
        matches!(result, Err(Error::Transport(_))),
        "expected Transport error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_logout_sends_bearer() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/oauth2/logout"))
        .and(header("authorization", "Bearer access-abc"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.logout(&token()).await.unwrap();
}

// ── Read tests ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_job_states_unwraps_data() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/jobs/states"))
        .and(header("authorization", "Bearer access-abc"))
        .and(header("x-api-version", "1.3-rev1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "id": "j1", "name": "Daily", "status": "Inactive", "lastResult": "Success" },
                { "id": "j2", "name": "Hourly", "status": "Running", "lastResult": "None" }
            ],
            "pagination": { "total": 2, "count": 2, "skip": 0, "limit": 200 }
        })))
        .mount(&server)
        .await;

    let jobs = client.list_job_states(&token()).await.unwrap();

    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0]["id"], "j1");
    assert_eq!(jobs[1]["status"], "Running");
}

#[tokio::test]
async fn test_expired_token_is_authentication_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/serverInfo"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.server_info(&token()).await;
    let err = result.unwrap_err();
    assert!(err.is_auth_expired(), "expected auth error, got: {err:?}");
}

#[tokio::test]
async fn test_structured_error_payload() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/license"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errorCode": "NotFound",
            "message": "License is not installed"
        })))
        .mount(&server)
        .await;

    let err = client.license(&token()).await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.api_error_code(), Some("NotFound"));
    assert!(err.to_string().contains("License is not installed"));
}

#[tokio::test]
async fn test_error_payload_with_http_200() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/backupInfrastructure/repositories/states"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errorCode": "AccessDenied",
            "message": "Insufficient privileges"
        })))
        .mount(&server)
        .await;

    let result = client.list_repository_states(&token()).await;
    assert!(
        matches!(result, Err(Error::Api { status: 200, ref error_code, .. }) if error_code.as_deref() == Some("AccessDenied")),
        "expected Api error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/backupInfrastructure/scaleOutRepositories"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
        .mount(&server)
        .await;

    let result = client.list_scale_out_repositories(&token()).await;
    assert!(matches!(result, Err(Error::Deserialization { .. })));
}

// ── Action tests ────────────────────────────────────────────────────

#[tokio::test]
async fn test_start_job_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/jobs/j1/start"))
        .and(body_json(json!({ "performActiveFull": false })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "session-1",
            "state": "Starting"
        })))
        .expect(1)
        .mount(&server)
        .await;

    client.start_job(&token(), "j1", false).await.unwrap();
}

#[tokio::test]
async fn test_job_id_is_one_path_segment() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/jobs/nightly%2Ffull%3Fx%23y/enable"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client
        .enable_job(&token(), "nightly/full?x#y")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_stop_job_graceful() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/jobs/j2/stop"))
        .and(body_json(json!({ "gracefulStop": true })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    client.stop_job(&token(), "j2", true).await.unwrap();
}

#[tokio::test]
async fn test_rescan_repository_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/backupInfrastructure/repositories/rescan"))
        .and(body_json(json!({ "repositoryIds": ["r1"] })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    client.rescan_repositories(&token(), &["r1".into()]).await.unwrap();
}

#[tokio::test]
async fn test_extent_sealed_mode() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(
            "/api/v1/backupInfrastructure/scaleOutRepositories/s1/enableSealedMode",
        ))
        .and(body_json(json!({ "repositoryIds": ["e1"] })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client
        .set_extent_mode(&token(), "s1", "e1", ExtentMode::Sealed, true)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_action_failure_payload_with_http_200() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/jobs/j1/retry"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errorCode": "InvalidOperation",
            "message": "Job has no failed objects"
        })))
        .mount(&server)
        .await;

    let err = client.retry_job(&token(), "j1").await.unwrap_err();
    assert_eq!(err.api_error_code(), Some("InvalidOperation"));
}

#[tokio::test]
async fn test_extent_mode_unsupported_on_old_api() {
    let (server, client) = setup_with(ApiVersion::V1_1Rev0).await;

    let result = client
        .set_extent_mode(&token(), "s1", "e1", ExtentMode::Maintenance, false)
        .await;

    assert!(matches!(
        result,
        Err(Error::Unsupported {
            version: ApiVersion::V1_1Rev0,
            ..
        })
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
}
