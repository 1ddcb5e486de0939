// ── Poll coordinator ──
//
// Runs the poll cycle on a fixed interval and on demand, keeps the last
// good snapshot, and publishes each new one to subscribers.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::error::CoreError;
use crate::model::Snapshot;
use crate::poll::poll;
use crate::session::SessionManager;
use crate::stream::SnapshotStream;

/// Result of one refresh trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A poll ran and its snapshot was published.
    Updated,
    /// Another poll was already in flight; nothing was done.
    Coalesced,
}

/// Outcome bookkeeping of the most recent cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoordinatorStatus {
    pub last_update_success: bool,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub polls: u64,
}

/// Owns the poll schedule and the current snapshot.
///
/// Cheaply cloneable; clones share state.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    backend: Arc<dyn Backend>,
    sessions: Arc<SessionManager>,
    interval: Duration,
    snapshot: ArcSwapOption<Snapshot>,
    snapshot_tx: watch::Sender<Option<Arc<Snapshot>>>,
    status: watch::Sender<CoordinatorStatus>,
    /// Held for the duration of a poll; `try_lock` failure means coalesce.
    in_flight: Mutex<()>,
    refresh_requested: Notify,
    task: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl Coordinator {
    /// A zero `interval` disables the periodic schedule; on-demand
    /// refreshes still work.
    pub fn new(
        backend: Arc<dyn Backend>,
        sessions: Arc<SessionManager>,
        interval: Duration,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(None);
        let (status, _) = watch::channel(CoordinatorStatus::default());
        Self {
            inner: Arc::new(CoordinatorInner {
                backend,
                sessions,
                interval,
                snapshot: ArcSwapOption::empty(),
                snapshot_tx,
                status,
                in_flight: Mutex::new(()),
                refresh_requested: Notify::new(),
                task: Mutex::new(None),
            }),
        }
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// The last successfully polled snapshot.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.inner.snapshot.load_full()
    }

    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.inner.snapshot_tx.subscribe())
    }

    pub fn status(&self) -> CoordinatorStatus {
        self.inner.status.borrow().clone()
    }

    pub fn status_watch(&self) -> watch::Receiver<CoordinatorStatus> {
        self.inner.status.subscribe()
    }

    /// Run one poll now, unless one is already running.
    ///
    /// On failure the previous snapshot stays current and the error is
    /// recorded in [`status`](Self::status) as well as returned.
    pub async fn refresh(&self) -> Result<RefreshOutcome, CoreError> {
        let Ok(_guard) = self.inner.in_flight.try_lock() else {
            debug!("poll already in flight, coalescing");
            return Ok(RefreshOutcome::Coalesced);
        };

        match poll(self.inner.backend.as_ref(), &self.inner.sessions).await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.inner.snapshot.store(Some(Arc::clone(&snapshot)));
                self.inner.status.send_modify(|s| {
                    s.last_update_success = true;
                    s.last_success = Some(Utc::now());
                    s.last_error = None;
                    s.polls += 1;
                });
                self.inner.snapshot_tx.send_replace(Some(snapshot));
                Ok(RefreshOutcome::Updated)
            }
            Err(e) => {
                warn!(error = %e, "poll failed, keeping previous snapshot");
                self.inner.status.send_modify(|s| {
                    s.last_update_success = false;
                    s.last_failure = Some(Utc::now());
                    s.last_error = Some(e.to_string());
                    s.polls += 1;
                });
                Err(e)
            }
        }
    }

    /// Ask the background task for an out-of-cycle poll.
    ///
    /// Without a running task the request is kept until one starts.
    pub fn request_refresh(&self) {
        self.inner.refresh_requested.notify_one();
    }

    /// Spawn the background poll task. Idempotent.
    pub async fn start(&self) {
        let mut task = self.inner.task.lock().await;
        if task.is_some() {
            return;
        }
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(poll_task(self.clone(), cancel.clone()));
        *task = Some((cancel, handle));
        info!(interval = ?self.inner.interval, "coordinator started");
    }

    /// Cancel the background task and wait for it to finish.
    pub async fn stop(&self) {
        let Some((cancel, handle)) = self.inner.task.lock().await.take() else {
            return;
        };
        cancel.cancel();
        let _ = handle.await;
        debug!("coordinator stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.inner.task.lock().await.is_some()
    }
}

/// Poll on the interval tick or on request until cancelled.
async fn poll_task(coordinator: Coordinator, cancel: CancellationToken) {
    let period = coordinator.inner.interval;
    let mut interval = (!period.is_zero()).then(|| {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });
    if let Some(interval) = interval.as_mut() {
        interval.tick().await; // consume the immediate first tick
    }

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = coordinator.inner.refresh_requested.notified() => {
                debug!("refresh requested");
            }
            _ = tick(interval.as_mut()) => {}
        }
        // Errors are recorded in the status channel by `refresh`.
        let _ = coordinator.refresh().await;
    }
}

async fn tick(interval: Option<&mut tokio::time::Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
