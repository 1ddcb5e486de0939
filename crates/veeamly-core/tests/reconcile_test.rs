#![allow(clippy::unwrap_used)]

mod support;

use std::sync::Arc;

use secrecy::SecretString;
use support::{FakeBackend, PASSWORD, USERNAME, sobr};
use veeamly_core::{
    ApiVersion, Backend, DeviceEntry, EntityRegistry, FileRegistry, MemoryRegistry, Platform,
    Reconciler, RegistryEntry, SessionManager, Snapshot, poll,
};

const ENTRY: &str = "entry1";

async fn snapshot(backend: &Arc<FakeBackend>) -> Snapshot {
    let sessions = SessionManager::new(
        Arc::clone(backend) as Arc<dyn Backend>,
        USERNAME.into(),
        SecretString::from(PASSWORD),
    );
    poll(backend.as_ref(), &sessions).await.unwrap()
}

fn reconciler(registry: &Arc<MemoryRegistry>, version: ApiVersion) -> Reconciler {
    Reconciler::new(
        ENTRY,
        Arc::clone(registry) as Arc<dyn EntityRegistry>,
        version.capabilities(),
    )
}

async fn unique_ids(registry: &dyn EntityRegistry) -> Vec<String> {
    registry
        .entries(ENTRY)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.unique_id)
        .collect()
}

async fn device_ids(registry: &dyn EntityRegistry) -> Vec<String> {
    registry
        .devices(ENTRY)
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.device_id)
        .collect()
}

// ── Creation ─────────────────────────────────────────────────────────

#[tokio::test]
async fn first_pass_creates_entities_and_devices() {
    let backend = FakeBackend::new();
    let registry = Arc::new(MemoryRegistry::new());
    let reconciler = reconciler(&registry, ApiVersion::default());

    let report = reconciler.reconcile(&snapshot(&backend).await).await.unwrap();

    assert!(!report.created.is_empty());
    assert!(report.removed.is_empty());
    let ids = unique_ids(registry.as_ref()).await;
    assert!(ids.contains(&"entry1_job_j1_status".to_owned()));
    assert!(ids.contains(&"entry1_job_j2_stop".to_owned()));
    assert!(ids.contains(&"entry1_repository_r1_capacity_warning".to_owned()));
    assert!(ids.contains(&"entry1_sobr_s1_extent_e2_disable_sealed_mode".to_owned()));
    assert!(ids.contains(&"entry1_server_build_version".to_owned()));
    assert!(ids.contains(&"entry1_license_expiration".to_owned()));

    assert_eq!(
        device_ids(registry.as_ref()).await,
        vec![
            "job_j1",
            "job_j2",
            "license_entry1",
            "repository_r1",
            "server_entry1",
            "sobr_s1"
        ]
    );
    let entries = registry.entries(ENTRY).await.unwrap();
    let status = entries
        .iter()
        .find(|e| e.unique_id == "entry1_job_j1_status")
        .unwrap();
    assert_eq!(status.entity_id, "sensor.veeam_daily_sql_status");
    assert_eq!(status.device_id, "job_j1");
    assert_eq!(status.platform, Platform::Sensor);
}

#[tokio::test]
async fn reconciling_twice_is_a_noop() {
    let backend = FakeBackend::new();
    let registry = Arc::new(MemoryRegistry::new());
    let reconciler = reconciler(&registry, ApiVersion::default());
    let snap = snapshot(&backend).await;

    reconciler.reconcile(&snap).await.unwrap();
    let count = registry.entry_count();
    let second = reconciler.reconcile(&snap).await.unwrap();

    assert!(second.is_noop());
    assert_eq!(registry.entry_count(), count);
}

#[tokio::test]
async fn unsupported_buttons_are_not_created() {
    let backend = FakeBackend::with_version(ApiVersion::V1_1Rev0);
    let registry = Arc::new(MemoryRegistry::new());
    let reconciler = reconciler(&registry, ApiVersion::V1_1Rev0);

    reconciler.reconcile(&snapshot(&backend).await).await.unwrap();

    let ids = unique_ids(registry.as_ref()).await;
    assert!(ids.iter().all(|id| !id.contains("_extent_")));
    assert!(ids.contains(&"entry1_job_j1_start".to_owned()));
    // No entities for the SOBR means no device either.
    assert!(!device_ids(registry.as_ref()).await.contains(&"sobr_s1".to_owned()));
}

// ── Removal ──────────────────────────────────────────────────────────

#[tokio::test]
async fn removed_job_loses_entities_and_device() {
    let backend = FakeBackend::new();
    let registry = Arc::new(MemoryRegistry::new());
    let reconciler = reconciler(&registry, ApiVersion::default());
    reconciler.reconcile(&snapshot(&backend).await).await.unwrap();

    backend.with(|s| s.jobs.retain(|j| j["id"] != "j2"));
    let report = reconciler.reconcile(&snapshot(&backend).await).await.unwrap();

    assert!(report.removed.iter().all(|id| id.starts_with("entry1_job_j2_")));
    assert_eq!(report.removed.len(), 9);
    assert_eq!(report.devices_removed, vec!["job_j2".to_owned()]);
    let ids = unique_ids(registry.as_ref()).await;
    assert!(ids.iter().all(|id| !id.starts_with("entry1_job_j2_")));
    assert!(ids.contains(&"entry1_job_j1_status".to_owned()));
}

#[tokio::test]
async fn removed_repository_and_extent_are_cleaned_up() {
    let backend = FakeBackend::new();
    let registry = Arc::new(MemoryRegistry::new());
    let reconciler = reconciler(&registry, ApiVersion::default());
    reconciler.reconcile(&snapshot(&backend).await).await.unwrap();

    backend.with(|s| {
        s.repositories.clear();
        s.repository_states.clear();
        s.sobrs = vec![sobr("s1", &[("e1", None)])];
    });
    reconciler.reconcile(&snapshot(&backend).await).await.unwrap();

    let ids = unique_ids(registry.as_ref()).await;
    assert!(ids.iter().all(|id| !id.starts_with("entry1_repository_r1_")));
    assert!(ids.iter().all(|id| !id.starts_with("entry1_sobr_s1_extent_e2_")));
    assert!(ids.contains(&"entry1_sobr_s1_extent_e1_enable_sealed_mode".to_owned()));

    let devices = device_ids(registry.as_ref()).await;
    assert!(!devices.contains(&"repository_r1".to_owned()));
    assert!(devices.contains(&"sobr_s1".to_owned()));
}

#[tokio::test]
async fn failed_reads_leave_their_entities_in_place() {
    let backend = FakeBackend::new();
    let registry = Arc::new(MemoryRegistry::new());
    let reconciler = reconciler(&registry, ApiVersion::default());
    reconciler.reconcile(&snapshot(&backend).await).await.unwrap();
    let before = unique_ids(registry.as_ref()).await;
    let devices_before = device_ids(registry.as_ref()).await;

    backend.with(|s| {
        s.failing.insert("sobrs");
        s.failing.insert("repositories");
        s.failing.insert("repository_states");
    });
    let report = reconciler.reconcile(&snapshot(&backend).await).await.unwrap();

    assert!(report.is_noop(), "{report:?}");
    assert_eq!(unique_ids(registry.as_ref()).await, before);
    assert_eq!(device_ids(registry.as_ref()).await, devices_before);

    // Once the read succeeds again a genuinely removed extent goes away.
    backend.with(|s| {
        s.failing.clear();
        s.sobrs = vec![sobr("s1", &[("e1", None)])];
    });
    let report = reconciler.reconcile(&snapshot(&backend).await).await.unwrap();
    assert!(
        report
            .removed
            .iter()
            .all(|id| id.starts_with("entry1_sobr_s1_extent_e2_"))
    );
    assert!(!report.removed.is_empty());
}

#[tokio::test]
async fn singletons_survive_missing_server_and_license() {
    let backend = FakeBackend::new();
    let registry = Arc::new(MemoryRegistry::new());
    let reconciler = reconciler(&registry, ApiVersion::default());
    reconciler.reconcile(&snapshot(&backend).await).await.unwrap();

    backend.with(|s| {
        s.failing.insert("server_info");
        s.failing.insert("license");
    });
    let report = reconciler.reconcile(&snapshot(&backend).await).await.unwrap();

    assert!(report.is_noop());
    let ids = unique_ids(registry.as_ref()).await;
    assert!(ids.contains(&"entry1_server_health_ok".to_owned()));
    assert!(ids.contains(&"entry1_license_status".to_owned()));
}

#[tokio::test]
async fn job_removed_and_readded_cycles_absent_present_absent() {
    let backend = FakeBackend::new();
    let registry = Arc::new(MemoryRegistry::new());
    let reconciler = reconciler(&registry, ApiVersion::default());
    let full = snapshot(&backend).await;

    reconciler.reconcile(&full).await.unwrap();
    backend.with(|s| s.jobs.truncate(1));
    reconciler.reconcile(&snapshot(&backend).await).await.unwrap();
    assert!(!registry.contains("entry1_job_j2_status"));

    let report = reconciler.reconcile(&full).await.unwrap();
    assert!(registry.contains("entry1_job_j2_status"));
    assert!(report.devices_created.contains(&"job_j2".to_owned()));
}

// ── Persistence and scoping ──────────────────────────────────────────

#[tokio::test]
async fn stale_entries_from_an_earlier_process_are_removed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.json");
    let backend = FakeBackend::new();

    {
        let registry = Arc::new(FileRegistry::open(&path).await.unwrap());
        let reconciler = Reconciler::new(
            ENTRY,
            registry as Arc<dyn EntityRegistry>,
            ApiVersion::default().capabilities(),
        );
        reconciler.reconcile(&snapshot(&backend).await).await.unwrap();
    }

    // A new process sees only job j1.
    backend.with(|s| s.jobs.truncate(1));
    let registry = Arc::new(FileRegistry::open(&path).await.unwrap());
    let reconciler = Reconciler::new(
        ENTRY,
        Arc::clone(&registry) as Arc<dyn EntityRegistry>,
        ApiVersion::default().capabilities(),
    );
    let report = reconciler.reconcile(&snapshot(&backend).await).await.unwrap();

    assert!(report.created.is_empty());
    assert_eq!(report.removed.len(), 9);
    assert!(
        unique_ids(registry.as_ref())
            .await
            .iter()
            .all(|id| !id.contains("_job_j2_"))
    );
}

#[tokio::test]
async fn other_entries_and_foreign_ids_are_untouched() {
    let backend = FakeBackend::new();
    let registry = Arc::new(MemoryRegistry::new());
    let foreign = RegistryEntry {
        entity_id: "sensor.other".into(),
        unique_id: "entry2_job_j9_status".into(),
        entry_id: "entry2".into(),
        device_id: "job_j9".into(),
        platform: Platform::Sensor,
        name: "Status".into(),
    };
    let unknown = RegistryEntry {
        entity_id: "sensor.custom".into(),
        unique_id: "entry1_custom_thing".into(),
        entry_id: ENTRY.into(),
        device_id: "custom".into(),
        platform: Platform::Sensor,
        name: "Custom".into(),
    };
    registry.add_entry(foreign).await.unwrap();
    registry.add_entry(unknown).await.unwrap();
    registry
        .add_device(DeviceEntry {
            device_id: "job_j9".into(),
            entry_id: "entry2".into(),
            name: "Other".into(),
            model: "Backup Job".into(),
        })
        .await
        .unwrap();

    reconciler(&registry, ApiVersion::default())
        .reconcile(&snapshot(&backend).await)
        .await
        .unwrap();

    assert!(registry.contains("entry2_job_j9_status"));
    assert!(registry.contains("entry1_custom_thing"));
    assert_eq!(registry.devices("entry2").await.unwrap().len(), 1);
}
