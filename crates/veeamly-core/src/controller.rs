// ── Controller facade ──
//
// Lifecycle of one configured backup server ("entry"): build the backend,
// authenticate and poll once, reconcile the registry, then keep polling
// and reconciling in the background until shutdown. Also the entry point
// for write actions and one-shot CLI use.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use veeamly_api::{Capabilities, TlsMode, TransportConfig, VeeamClient};

use crate::action::Action;
use crate::backend::Backend;
use crate::config::{ServerConfig, TlsVerification};
use crate::coordinator::{Coordinator, CoordinatorStatus, RefreshOutcome};
use crate::diagnostics::{self, DiagnosticsReport, EntryInfo};
use crate::entity::{DeviceSpec, EntityState, Platform, desired_entities, is_available, state_of};
use crate::error::CoreError;
use crate::model::Snapshot;
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::registry::{EntityRegistry, MemoryRegistry};
use crate::session::{SessionManager, TokenInfo};
use crate::stream::SnapshotStream;

/// Builds the backend for a configuration; called on setup and reload.
pub type BackendFactory =
    Arc<dyn Fn(&ServerConfig) -> Result<Arc<dyn Backend>, CoreError> + Send + Sync>;

// ── ConnectionState ──────────────────────────────────────────────

/// Lifecycle state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

// ── EntityView ───────────────────────────────────────────────────

/// One entity with its current value, for display.
#[derive(Debug, Clone, Serialize)]
pub struct EntityView {
    pub unique_id: String,
    pub entity_id: String,
    pub name: String,
    pub platform: Platform,
    pub device_id: String,
    pub device_name: String,
    pub state: EntityState,
    pub available: bool,
}

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    entry_id: String,
    config: ArcSwap<ServerConfig>,
    registry: Arc<dyn EntityRegistry>,
    factory: BackendFactory,
    connection_state: watch::Sender<ConnectionState>,
    runtime: Mutex<Option<Runtime>>,
}

/// Everything built from one configuration.
struct Runtime {
    backend: Arc<dyn Backend>,
    sessions: Arc<SessionManager>,
    coordinator: Coordinator,
    reconciler: Arc<Reconciler>,
    reconcile_task: Option<(CancellationToken, JoinHandle<()>)>,
}

impl Controller {
    /// Set up an entry against a real VBR server.
    ///
    /// Fails when the first poll fails: `AuthenticationFailed` for
    /// rejected credentials, `ConnectionFailed` / `Timeout` when the
    /// server is unreachable.
    pub async fn setup(
        config: ServerConfig,
        entry_id: impl Into<String>,
        registry: Arc<dyn EntityRegistry>,
    ) -> Result<Self, CoreError> {
        Self::setup_with_factory(config, entry_id, registry, Arc::new(client_backend)).await
    }

    /// Set up an entry against a caller-supplied backend.
    pub async fn setup_with_backend(
        config: ServerConfig,
        entry_id: impl Into<String>,
        registry: Arc<dyn EntityRegistry>,
        backend: Arc<dyn Backend>,
    ) -> Result<Self, CoreError> {
        let factory: BackendFactory =
            Arc::new(move |_: &ServerConfig| Ok::<_, CoreError>(Arc::clone(&backend)));
        Self::setup_with_factory(config, entry_id, registry, factory).await
    }

    pub async fn setup_with_factory(
        config: ServerConfig,
        entry_id: impl Into<String>,
        registry: Arc<dyn EntityRegistry>,
        factory: BackendFactory,
    ) -> Result<Self, CoreError> {
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let controller = Self {
            inner: Arc::new(ControllerInner {
                entry_id: entry_id.into(),
                config: ArcSwap::from_pointee(config),
                registry,
                factory,
                connection_state,
                runtime: Mutex::new(None),
            }),
        };
        controller.start_runtime().await?;
        Ok(controller)
    }

    /// Stop background work and log out. The controller can be brought
    /// back with [`reload`](Self::reload).
    pub async fn shutdown(&self) {
        self.stop_runtime().await;
        let _ = self
            .inner
            .connection_state
            .send(ConnectionState::Disconnected);
        info!(entry_id = %self.inner.entry_id, "entry shut down");
    }

    /// Tear down and rebuild the session, backend and poll cycle with a
    /// new configuration.
    pub async fn reload(&self, config: ServerConfig) -> Result<(), CoreError> {
        info!(entry_id = %self.inner.entry_id, host = %config.host, "reloading entry");
        self.stop_runtime().await;
        self.inner.config.store(Arc::new(config));
        self.start_runtime().await
    }

    /// Connect, run `f`, shut down.
    ///
    /// No background polling and a throwaway in-memory registry: one poll
    /// cycle feeds `f`, which is all a single CLI invocation needs.
    pub async fn oneshot<F, Fut, T>(config: ServerConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.poll_interval = std::time::Duration::ZERO;

        let controller = Controller::setup(cfg, "oneshot", Arc::new(MemoryRegistry::new())).await?;
        let result = f(controller.clone()).await;
        controller.shutdown().await;
        result
    }

    // ── Runtime lifecycle ────────────────────────────────────────

    async fn start_runtime(&self) -> Result<(), CoreError> {
        let mut slot = self.inner.runtime.lock().await;
        let config = self.inner.config.load_full();
        let _ = self
            .inner
            .connection_state
            .send(ConnectionState::Connecting);

        let backend = match (self.inner.factory)(&config) {
            Ok(backend) => backend,
            Err(e) => {
                let _ = self.inner.connection_state.send(ConnectionState::Failed);
                return Err(e);
            }
        };
        let sessions = Arc::new(SessionManager::new(
            Arc::clone(&backend),
            config.username.clone(),
            config.password.clone(),
        ));
        let coordinator = Coordinator::new(
            Arc::clone(&backend),
            Arc::clone(&sessions),
            config.poll_interval,
        );

        if let Err(e) = coordinator.refresh().await {
            let _ = self.inner.connection_state.send(ConnectionState::Failed);
            return Err(e);
        }

        let reconciler = Arc::new(Reconciler::new(
            self.inner.entry_id.clone(),
            Arc::clone(&self.inner.registry),
            backend.capabilities(),
        ));
        if let Some(snapshot) = coordinator.snapshot() {
            if let Err(e) = reconciler.reconcile(&snapshot).await {
                let _ = self.inner.connection_state.send(ConnectionState::Failed);
                sessions.logout().await;
                return Err(e);
            }
        }

        let mut reconcile_task = None;
        if !config.poll_interval.is_zero() {
            let cancel = CancellationToken::new();
            let handle = tokio::spawn(reconcile_loop(
                Arc::clone(&reconciler),
                coordinator.subscribe(),
                cancel.clone(),
            ));
            reconcile_task = Some((cancel, handle));
            coordinator.start().await;
        }

        *slot = Some(Runtime {
            backend,
            sessions,
            coordinator,
            reconciler,
            reconcile_task,
        });
        let _ = self
            .inner
            .connection_state
            .send(ConnectionState::Connected);
        info!(entry_id = %self.inner.entry_id, server = %config.title(), "entry ready");
        Ok(())
    }

    async fn stop_runtime(&self) {
        let Some(runtime) = self.inner.runtime.lock().await.take() else {
            return;
        };
        runtime.coordinator.stop().await;
        if let Some((cancel, handle)) = runtime.reconcile_task {
            cancel.cancel();
            let _ = handle.await;
        }
        runtime.sessions.logout().await;
        if let Err(e) = self.inner.registry.flush().await {
            warn!(error = %e, "registry flush failed");
        }
        debug!(entry_id = %self.inner.entry_id, "runtime stopped");
    }

    /// Cloned handles of the running runtime.
    async fn handles(
        &self,
    ) -> Result<(Arc<dyn Backend>, Arc<SessionManager>, Coordinator, Arc<Reconciler>), CoreError>
    {
        let guard = self.inner.runtime.lock().await;
        let rt = guard.as_ref().ok_or(CoreError::ControllerDisconnected)?;
        Ok((
            Arc::clone(&rt.backend),
            Arc::clone(&rt.sessions),
            rt.coordinator.clone(),
            Arc::clone(&rt.reconciler),
        ))
    }

    // ── Actions ──────────────────────────────────────────────────

    /// Run a write action, then request an immediate refresh.
    ///
    /// Every failure other than a missing capability or target is
    /// reported as `ActionFailed`.
    pub async fn execute(&self, action: Action) -> Result<(), CoreError> {
        let (backend, sessions, coordinator, _) = self.handles().await?;

        let capability = action.capability();
        if !backend.capabilities().supports(capability) {
            return Err(CoreError::Unsupported {
                operation: action.name().to_owned(),
                required: format!(
                    "{capability}, which API {} does not offer",
                    backend.capabilities().version
                ),
            });
        }
        if let Some(snapshot) = coordinator.snapshot() {
            let target = action.target();
            if snapshot.find(&target).is_none() {
                return Err(CoreError::NotFound {
                    entity_type: target.category().to_string(),
                    identifier: target.logical_key(),
                });
            }
        }

        let session = sessions.ensure_session().await?;
        match backend.perform(&session, &action).await {
            Ok(()) => {
                info!(%action, "action succeeded");
                coordinator.request_refresh();
                Ok(())
            }
            Err(e) => {
                error!(%action, error = %e, "action failed");
                if e.is_auth() {
                    sessions.invalidate().await;
                }
                Err(match e {
                    CoreError::Unsupported { .. } => e,
                    other => CoreError::ActionFailed {
                        action: action.to_string(),
                        message: other.to_string(),
                    },
                })
            }
        }
    }

    // ── State observation ────────────────────────────────────────

    pub fn entry_id(&self) -> &str {
        &self.inner.entry_id
    }

    pub fn config(&self) -> Arc<ServerConfig> {
        self.inner.config.load_full()
    }

    pub fn registry(&self) -> &Arc<dyn EntityRegistry> {
        &self.inner.registry
    }

    /// Subscribe to lifecycle state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    pub async fn snapshot(&self) -> Option<Arc<Snapshot>> {
        let guard = self.inner.runtime.lock().await;
        guard.as_ref().and_then(|rt| rt.coordinator.snapshot())
    }

    pub async fn subscribe(&self) -> Result<SnapshotStream, CoreError> {
        let (_, _, coordinator, _) = self.handles().await?;
        Ok(coordinator.subscribe())
    }

    pub async fn status(&self) -> Result<CoordinatorStatus, CoreError> {
        let (_, _, coordinator, _) = self.handles().await?;
        Ok(coordinator.status())
    }

    pub async fn capabilities(&self) -> Result<Capabilities, CoreError> {
        let (backend, ..) = self.handles().await?;
        Ok(backend.capabilities())
    }

    pub async fn token_info(&self) -> Result<TokenInfo, CoreError> {
        let (_, sessions, ..) = self.handles().await?;
        Ok(sessions.token_info().await)
    }

    /// Poll now and reconcile the result, bypassing the schedule.
    pub async fn refresh(&self) -> Result<RefreshOutcome, CoreError> {
        let (_, _, coordinator, reconciler) = self.handles().await?;
        let outcome = coordinator.refresh().await?;
        if outcome == RefreshOutcome::Updated && !coordinator.is_running().await {
            // Without a background task nobody else reconciles.
            if let Some(snapshot) = coordinator.snapshot() {
                reconciler.reconcile(&snapshot).await?;
            }
        }
        Ok(outcome)
    }

    /// Reconcile the current snapshot on demand.
    pub async fn reconcile(&self) -> Result<ReconcileReport, CoreError> {
        let (_, _, coordinator, reconciler) = self.handles().await?;
        let snapshot = coordinator.snapshot().ok_or_else(|| CoreError::UpdateFailed {
            message: "no snapshot available yet".into(),
        })?;
        reconciler.reconcile(&snapshot).await
    }

    /// Every entity the current snapshot calls for, with its value.
    pub async fn entities(&self) -> Result<Vec<EntityView>, CoreError> {
        let (backend, _, coordinator, _) = self.handles().await?;
        let Some(snapshot) = coordinator.snapshot() else {
            return Ok(Vec::new());
        };
        let capabilities = backend.capabilities();
        Ok(desired_entities(&self.inner.entry_id, &snapshot, &capabilities)
            .into_iter()
            .map(|d| {
                let DeviceSpec {
                    device_id, name: device_name, ..
                } = d.device;
                EntityView {
                    state: state_of(&snapshot, &d.source, d.descriptor.suffix),
                    available: is_available(&snapshot, &d.source, d.descriptor.suffix),
                    unique_id: d.unique_id,
                    entity_id: d.entity_id,
                    name: d.name,
                    platform: d.descriptor.platform,
                    device_id,
                    device_name,
                }
            })
            .collect())
    }

    /// Redacted diagnostics for this entry.
    pub async fn diagnostics(&self) -> Result<DiagnosticsReport, CoreError> {
        let (_, sessions, coordinator, _) = self.handles().await?;
        let snapshot = coordinator.snapshot();
        Ok(diagnostics::report(
            EntryInfo::new(&self.inner.entry_id, &self.config()),
            coordinator.status(),
            snapshot.as_deref(),
            sessions.token_info().await,
        ))
    }
}

/// The production backend: a `VeeamClient` for the configured server.
fn client_backend(config: &ServerConfig) -> Result<Arc<dyn Backend>, CoreError> {
    let tls = match &config.tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    };
    let transport = TransportConfig::default()
        .with_tls(tls)
        .with_timeout(config.timeout);
    let client = VeeamClient::new(config.base_url()?, config.api_version, &transport)?;
    Ok(Arc::new(client))
}

/// Reconcile every snapshot the coordinator publishes.
async fn reconcile_loop(
    reconciler: Arc<Reconciler>,
    mut snapshots: SnapshotStream,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            snapshot = snapshots.changed() => {
                let Some(snapshot) = snapshot else { break };
                if let Err(e) = reconciler.reconcile(&snapshot).await {
                    warn!(error = %e, "reconciliation failed");
                }
            }
        }
    }
}
