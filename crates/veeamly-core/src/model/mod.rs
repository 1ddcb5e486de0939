// ── Domain model ──
//
// Normalized representations of the VBR records a poll cycle produces.
// Every optional server field is an `Option`; fields the model does not
// name survive in `extra` so nothing the server reports is lost.

pub mod job;
pub mod repository;
pub mod snapshot;
pub mod sobr;
pub mod system;

pub use job::{Job, RUNNING_STATUSES};
pub use repository::Repository;
pub use snapshot::{Diagnostics, Record, Snapshot};
pub use sobr::{Extent, ScaleOutRepository};
pub use system::{LicenseInfo, ServerInfo};

/// Forward-compatible bag of fields not captured by a typed model.
pub type Extra = std::collections::BTreeMap<String, serde_json::Value>;
