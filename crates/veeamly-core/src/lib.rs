//! Polling, session and entity layer between `veeamly-api` and its consumers.
//!
//! This crate owns the business logic for watching a Veeam Backup &
//! Replication server:
//!
//! - **[`Controller`]**: Facade for one configured server ("entry"):
//!   [`setup()`](Controller::setup) authenticates, polls once, reconciles the
//!   entity registry and starts background polling.
//!   [`Controller::oneshot()`](Controller::oneshot) runs a single cycle for CLI
//!   use.
//!
//! - **[`SessionManager`]**: Owns the OAuth2 token pair, refreshing it a
//!   minute before expiry (refresh grant first, password grant second).
//!
//! - **[`poll()`]** / [`normalize`]: one fetch cycle turning loosely typed
//!   REST payloads into an immutable [`Snapshot`]. Jobs are mandatory, every
//!   other section is best-effort.
//!
//! - **[`Coordinator`]**: Interval and on-demand polling with coalescing,
//!   keeping the last good snapshot and publishing new ones through a
//!   [`SnapshotStream`].
//!
//! - **[`Reconciler`]**: Converges an [`EntityRegistry`] on the entities a
//!   snapshot calls for ([`entity`] catalogue), removing those of vanished
//!   jobs, repositories and extents.
//!
//! - **[`Backend`]**: The outbound seam; `VeeamClient` implements it.

pub mod action;
pub mod backend;
pub mod config;
pub mod controller;
pub mod coordinator;
pub mod diagnostics;
pub mod entity;
pub mod error;
pub mod model;
pub mod normalize;
pub mod poll;
pub mod reconcile;
pub mod registry;
pub mod session;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use action::Action;
pub use backend::Backend;
pub use config::{ServerConfig, TlsVerification};
pub use controller::{BackendFactory, ConnectionState, Controller, EntityView};
pub use coordinator::{Coordinator, CoordinatorStatus, RefreshOutcome};
pub use diagnostics::{DiagnosticsReport, EntryInfo};
pub use entity::{Category, EntityState, Platform, SourceKey};
pub use error::CoreError;
pub use poll::poll;
pub use reconcile::{ReconcileReport, Reconciler};
pub use registry::{DeviceEntry, EntityRegistry, FileRegistry, MemoryRegistry, RegistryEntry};
pub use session::{Session, SessionManager, TokenInfo};
pub use stream::SnapshotStream;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Diagnostics, Extent, Job, LicenseInfo, Repository, ScaleOutRepository, ServerInfo, Snapshot,
};

// API types consumers need without depending on `veeamly-api` directly.
pub use veeamly_api::{ApiVersion, Capabilities, Capability};
