#![allow(clippy::unwrap_used)]
// Lifecycle, action and end-to-end tests for `Controller`.

mod support;

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use support::{FakeBackend, PASSWORD, USERNAME};
use veeamly_core::{
    Action, ApiVersion, Backend, ConnectionState, Controller, CoreError, EntityRegistry,
    EntityState, MemoryRegistry, ServerConfig,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

fn config(poll_interval: Duration) -> ServerConfig {
    ServerConfig {
        host: "vbr.test".into(),
        username: USERNAME.into(),
        password: SecretString::from(PASSWORD),
        poll_interval,
        ..ServerConfig::default()
    }
}

async fn setup(backend: &Arc<FakeBackend>) -> (Controller, Arc<MemoryRegistry>) {
    let registry = Arc::new(MemoryRegistry::new());
    let controller = Controller::setup_with_backend(
        config(Duration::ZERO),
        "entry1",
        Arc::clone(&registry) as Arc<dyn EntityRegistry>,
        Arc::clone(backend) as Arc<dyn Backend>,
    )
    .await
    .unwrap();
    (controller, registry)
}

async fn wait_until(mut check: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn setup_polls_and_registers_entities() {
    let backend = FakeBackend::new();
    let (controller, registry) = setup(&backend).await;

    assert_eq!(
        *controller.connection_state().borrow(),
        ConnectionState::Connected
    );
    assert_eq!(controller.snapshot().await.unwrap().jobs.len(), 2);
    assert!(registry.contains("entry1_job_j1_status"));
    assert!(registry.contains("entry1_server_connected"));
}

#[tokio::test]
async fn setup_with_bad_credentials_fails_with_auth_error() {
    let backend = FakeBackend::new();
    let registry = Arc::new(MemoryRegistry::new());
    let mut cfg = config(Duration::ZERO);
    cfg.password = SecretString::from("wrong");

    let err = Controller::setup_with_backend(
        cfg,
        "entry1",
        Arc::clone(&registry) as Arc<dyn EntityRegistry>,
        Arc::clone(&backend) as Arc<dyn Backend>,
    )
    .await
    .err()
    .unwrap();

    assert!(err.is_auth());
    assert_eq!(registry.entry_count(), 0);
}

#[tokio::test]
async fn shutdown_logs_out_and_rejects_actions() {
    let backend = FakeBackend::new();
    let (controller, _) = setup(&backend).await;

    controller.shutdown().await;

    assert_eq!(backend.with(|s| s.logouts), 1);
    assert_eq!(
        *controller.connection_state().borrow(),
        ConnectionState::Disconnected
    );
    let err = controller
        .execute(Action::RetryJob { id: "j1".into() })
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ControllerDisconnected));
}

#[tokio::test]
async fn reload_rebuilds_session_with_new_config() {
    let backend = FakeBackend::new();
    let (controller, _) = setup(&backend).await;

    let mut cfg = config(Duration::ZERO);
    cfg.api_version = ApiVersion::V1_2Rev0;
    controller.reload(cfg).await.unwrap();

    assert_eq!(backend.with(|s| s.logouts), 1);
    assert_eq!(backend.with(|s| s.password_grants), 2);
    assert_eq!(controller.config().api_version, ApiVersion::V1_2Rev0);
    assert!(controller.snapshot().await.is_some());
}

// ── Actions ─────────────────────────────────────────────────────────

#[tokio::test]
async fn execute_performs_action() {
    let backend = FakeBackend::new();
    let (controller, _) = setup(&backend).await;
    let action = Action::StartJob {
        id: "j1".into(),
        active_full: true,
    };

    controller.execute(action.clone()).await.unwrap();

    assert_eq!(backend.with(|s| s.performed.clone()), vec![action]);
}

#[tokio::test]
async fn error_payload_becomes_action_failed() {
    let backend = FakeBackend::new();
    backend.with(|s| s.action_error = Some("Job is already running".into()));
    let (controller, _) = setup(&backend).await;

    let err = controller
        .execute(Action::StartJob {
            id: "j2".into(),
            active_full: false,
        })
        .await
        .unwrap_err();

    match err {
        CoreError::ActionFailed { action, message } => {
            assert_eq!(action, "start job (job:j2)");
            assert!(message.contains("already running"));
        }
        other => panic!("expected ActionFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn rejected_token_during_action_forces_new_login() {
    let backend = FakeBackend::new();
    let (controller, _) = setup(&backend).await;
    backend.with(|s| {
        s.revoked_tokens.insert("password-access-1".into());
    });
    let action = Action::RetryJob { id: "j1".into() };

    let err = controller.execute(action.clone()).await.unwrap_err();
    assert!(matches!(err, CoreError::ActionFailed { .. }));
    assert!(!controller.token_info().await.unwrap().has_access_token);

    controller.execute(action.clone()).await.unwrap();
    assert_eq!(backend.with(|s| s.password_grants), 2);
    assert_eq!(backend.with(|s| s.performed.clone()), vec![action]);
}

#[tokio::test]
async fn unsupported_action_never_reaches_backend() {
    let backend = FakeBackend::with_version(ApiVersion::V1_1Rev0);
    let (controller, _) = setup(&backend).await;

    let err = controller
        .execute(Action::EnableExtentSealedMode {
            sobr_id: "s1".into(),
            extent_id: "e1".into(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Unsupported { .. }));
    assert!(backend.with(|s| s.performed.is_empty()));
}

#[tokio::test]
async fn unknown_target_is_not_found() {
    let backend = FakeBackend::new();
    let (controller, _) = setup(&backend).await;

    let err = controller
        .execute(Action::RescanRepository { id: "nope".into() })
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::NotFound { .. }));
}

// ── Entities and diagnostics ────────────────────────────────────────

#[tokio::test]
async fn entity_views_carry_state_and_availability() {
    let backend = FakeBackend::new();
    let (controller, _) = setup(&backend).await;

    let views = controller.entities().await.unwrap();
    let find = |uid: &str| views.iter().find(|v| v.unique_id == uid).unwrap();

    assert_eq!(
        find("entry1_job_j2_status").state,
        EntityState::Text("running".into())
    );
    assert!(!find("entry1_job_j2_start").available);
    assert!(find("entry1_job_j2_stop").available);
    assert!(!find("entry1_job_j1_retry").available);
    assert_eq!(
        find("entry1_repository_r1_used_space_percent").state,
        EntityState::Number(60.0)
    );
    assert!(find("entry1_sobr_s1_extent_e2_disable_sealed_mode").available);
    assert!(!find("entry1_sobr_s1_extent_e2_enable_sealed_mode").available);
}

#[tokio::test]
async fn diagnostics_summarize_without_secrets() {
    let backend = FakeBackend::new();
    let (controller, _) = setup(&backend).await;

    let report = controller.diagnostics().await.unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["data"]["jobs"], 2);
    assert_eq!(json["jobs_summary"]["running"], 1);
    assert_eq!(json["coordinator"]["last_update_success"], true);
    assert_eq!(json["session"]["has_access_token"], true);
    assert!(!json.to_string().contains(PASSWORD));
}

// ── Background reconciliation ───────────────────────────────────────

#[tokio::test]
async fn background_poll_reconciles_removed_job() {
    let backend = FakeBackend::new();
    let registry = Arc::new(MemoryRegistry::new());
    let controller = Controller::setup_with_backend(
        config(Duration::from_secs(3600)),
        "entry1",
        Arc::clone(&registry) as Arc<dyn EntityRegistry>,
        Arc::clone(&backend) as Arc<dyn Backend>,
    )
    .await
    .unwrap();
    assert!(registry.contains("entry1_job_j2_status"));

    backend.with(|s| s.jobs.truncate(1));
    controller.refresh().await.unwrap();

    wait_until(|| !registry.contains("entry1_job_j2_status")).await;
    controller.shutdown().await;
}

// ── End to end over HTTP ────────────────────────────────────────────

#[tokio::test]
async fn oneshot_against_http_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "a1",
            "refresh_token": "r1",
            "expires_in": 900
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/jobs/states"))
        .and(header("authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": "j1", "name": "Nightly", "status": "Inactive", "lastResult": "Failed" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/oauth2/logout"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    // Every other read fails; those sections are best-effort.

    let cfg = ServerConfig {
        host: server.uri(),
        ..config(Duration::from_secs(60))
    };
    let jobs = Controller::oneshot(cfg, |c| async move {
        let snapshot = c.snapshot().await.unwrap();
        Ok(snapshot.jobs.clone())
    })
    .await
    .unwrap();

    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].last_result, "failed");
    assert!(jobs[0].can_retry());
}
