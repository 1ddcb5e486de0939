#![allow(clippy::unwrap_used)]

mod support;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use support::{FakeBackend, PASSWORD, USERNAME};
use veeamly_core::{Backend, Category, CoreError, SessionManager, poll};

fn sessions(backend: &Arc<FakeBackend>) -> SessionManager {
    SessionManager::new(
        Arc::clone(backend) as Arc<dyn Backend>,
        USERNAME.into(),
        SecretString::from(PASSWORD),
    )
}

// ── Happy path ───────────────────────────────────────────────────────

#[tokio::test]
async fn full_cycle_produces_normalized_snapshot() {
    let backend = FakeBackend::new();
    let snapshot = poll(backend.as_ref(), &sessions(&backend)).await.unwrap();

    assert_eq!(snapshot.jobs.len(), 2);
    let j1 = snapshot.job("j1").unwrap();
    assert_eq!(j1.status, "inactive");
    assert_eq!(j1.last_result, "success");
    assert_eq!(j1.job_type, "Backup");
    assert!(j1.last_run.is_some());
    assert_eq!(snapshot.job("j2").unwrap().last_result, "unknown");

    let r1 = snapshot.repository("r1").unwrap();
    assert_eq!(r1.description.as_deref(), Some("Main storage"));
    assert_eq!(r1.capacity_gb, Some(1000.0));
    assert_eq!(r1.is_accessible, r1.is_online);

    let s1 = snapshot.sobr("s1").unwrap();
    assert_eq!(s1.extents.len(), 2);
    assert!(s1.extent("e2").unwrap().is_sealed());

    assert_eq!(
        snapshot.server_info.as_ref().unwrap().build_version.as_deref(),
        Some("12.3.1.1139")
    );
    assert_eq!(
        snapshot.license_info.as_ref().unwrap().auto_update_enabled,
        Some(false)
    );

    assert!(snapshot.diagnostics.connected);
    assert!(snapshot.diagnostics.health_ok);
    assert!(snapshot.diagnostics.last_successful_poll.is_some());
}

#[tokio::test]
async fn every_read_uses_the_session_token() {
    let backend = FakeBackend::new();
    poll(backend.as_ref(), &sessions(&backend)).await.unwrap();

    let tokens = backend.with(|s| s.tokens_seen.clone());
    assert_eq!(tokens.len(), 6);
    assert!(tokens.iter().all(|t| t == "password-access-1"));
}

// ── Mandatory vs best-effort ─────────────────────────────────────────

#[tokio::test]
async fn job_failure_fails_the_cycle() {
    let backend = FakeBackend::new();
    backend.with(|s| {
        s.failing.insert("jobs");
    });

    let err = poll(backend.as_ref(), &sessions(&backend))
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::UpdateFailed { .. }));
}

#[tokio::test]
async fn session_failure_fails_fast_without_reads() {
    let backend = FakeBackend::new();
    let sessions = SessionManager::new(
        Arc::clone(&backend) as Arc<dyn Backend>,
        USERNAME.into(),
        SecretString::from("nope"),
    );

    let err = poll(backend.as_ref(), &sessions).await.unwrap_err();

    assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
    assert_eq!(backend.with(|s| s.job_fetches), 0);
}

#[tokio::test]
async fn best_effort_sections_degrade_independently() {
    let backend = FakeBackend::new();
    backend.with(|s| {
        s.failing.insert("license");
        s.failing.insert("repository_states");
        s.failing.insert("sobrs");
    });

    let snapshot = poll(backend.as_ref(), &sessions(&backend)).await.unwrap();

    assert_eq!(snapshot.jobs.len(), 2);
    assert!(snapshot.server_info.is_some());
    assert!(snapshot.license_info.is_none());
    assert!(snapshot.sobrs.is_empty());

    // Configuration alone still yields the repository, without capacity.
    let r1 = snapshot.repository("r1").unwrap();
    assert_eq!(r1.description.as_deref(), Some("Main storage"));
    assert_eq!(r1.capacity_gb, None);
    assert_eq!(r1.is_online, None);
    assert!(snapshot.diagnostics.health_ok);
    assert_eq!(
        snapshot.diagnostics.failed_sections,
        vec![Category::License, Category::Repository, Category::Extent]
    );
}

#[tokio::test]
async fn revoked_token_is_dropped_and_next_cycle_logs_in_again() {
    let backend = FakeBackend::new();
    let sessions = sessions(&backend);
    backend.with(|s| {
        s.revoked_tokens.insert("password-access-1".into());
    });

    let err = poll(backend.as_ref(), &sessions).await.unwrap_err();
    assert!(matches!(err, CoreError::UpdateFailed { .. }));
    assert!(sessions.current().await.is_none());

    let snapshot = poll(backend.as_ref(), &sessions).await.unwrap();
    assert_eq!(snapshot.jobs.len(), 2);
    assert_eq!(backend.with(|s| s.password_grants), 2);
    assert_eq!(backend.with(|s| s.refresh_grants), 0);
}

// ── Record-level failures ────────────────────────────────────────────

#[tokio::test]
async fn unparseable_records_are_skipped() {
    let backend = FakeBackend::new();
    backend.with(|s| {
        s.jobs.push(json!({ "name": "no id" }));
        s.jobs.push(json!("garbage"));
        s.server_info = json!([]);
    });

    let snapshot = poll(backend.as_ref(), &sessions(&backend)).await.unwrap();

    assert_eq!(snapshot.jobs.len(), 2);
    assert!(snapshot.server_info.is_none());
}
