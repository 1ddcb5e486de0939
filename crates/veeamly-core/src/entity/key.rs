// ── Entity identity ──
//
// Unique ids, device ids and logical keys are pure functions of
// (entry id, category, source id, suffix). Restarting with the same
// entry id therefore converges on the same registry contents.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Record category an entity is derived from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    Job,
    Repository,
    Extent,
    Server,
    License,
}

/// Identifies the snapshot record an entity reads from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKey {
    Job(String),
    Repository(String),
    Extent { sobr_id: String, extent_id: String },
    Server,
    License,
}

impl SourceKey {
    pub fn category(&self) -> Category {
        match self {
            Self::Job(_) => Category::Job,
            Self::Repository(_) => Category::Repository,
            Self::Extent { .. } => Category::Extent,
            Self::Server => Category::Server,
            Self::License => Category::License,
        }
    }

    /// Singletons exist once per entry and are never reconciled away.
    pub fn is_singleton(&self) -> bool {
        matches!(self, Self::Server | Self::License)
    }

    /// `job:<id>`, `repository:<id>`, `sobr:<sobr_id>:extent:<extent_id>`,
    /// `server`, `license`.
    pub fn logical_key(&self) -> String {
        match self {
            Self::Job(id) => format!("job:{id}"),
            Self::Repository(id) => format!("repository:{id}"),
            Self::Extent { sobr_id, extent_id } => format!("sobr:{sobr_id}:extent:{extent_id}"),
            Self::Server => "server".into(),
            Self::License => "license".into(),
        }
    }

    /// Inverse of [`logical_key`](Self::logical_key).
    pub fn parse_logical(raw: &str) -> Option<Self> {
        match raw {
            "server" => return Some(Self::Server),
            "license" => return Some(Self::License),
            _ => {}
        }
        if let Some(rest) = raw.strip_prefix("sobr:") {
            let (sobr_id, extent_id) = rest.split_once(":extent:")?;
            if sobr_id.is_empty() || extent_id.is_empty() {
                return None;
            }
            return Some(Self::Extent {
                sobr_id: sobr_id.into(),
                extent_id: extent_id.into(),
            });
        }
        let (category, id) = raw.split_once(':')?;
        if id.is_empty() {
            return None;
        }
        match category {
            "job" => Some(Self::Job(id.into())),
            "repository" => Some(Self::Repository(id.into())),
            _ => None,
        }
    }

    /// Prefix shared by every unique id derived from this source,
    /// trailing separator included.
    pub fn unique_prefix(&self, entry_id: &str) -> String {
        match self {
            Self::Job(id) => format!("{entry_id}_job_{id}_"),
            Self::Repository(id) => format!("{entry_id}_repository_{id}_"),
            Self::Extent { sobr_id, extent_id } => {
                format!("{entry_id}_sobr_{sobr_id}_extent_{extent_id}_")
            }
            Self::Server => format!("{entry_id}_server_"),
            Self::License => format!("{entry_id}_license_"),
        }
    }

    pub fn unique_id(&self, entry_id: &str, suffix: &str) -> String {
        format!("{}{suffix}", self.unique_prefix(entry_id))
    }

    /// Device grouping the entities of this source.
    ///
    /// Extents group under their scale-out repository.
    pub fn device_id(&self, entry_id: &str) -> String {
        match self {
            Self::Job(id) => format!("job_{id}"),
            Self::Repository(id) => format!("repository_{id}"),
            Self::Extent { sobr_id, .. } => format!("sobr_{sobr_id}"),
            Self::Server => format!("server_{entry_id}"),
            Self::License => format!("license_{entry_id}"),
        }
    }
}

/// Category of a persisted unique id, judged by its prefix alone.
///
/// Returns `None` for ids that belong to another entry or that this
/// crate did not create.
pub fn category_of_unique_id(entry_id: &str, unique_id: &str) -> Option<Category> {
    let rest = unique_id.strip_prefix(entry_id)?.strip_prefix('_')?;
    if rest.starts_with("job_") {
        Some(Category::Job)
    } else if rest.starts_with("repository_") {
        Some(Category::Repository)
    } else if rest.starts_with("sobr_") && rest.contains("_extent_") {
        Some(Category::Extent)
    } else if rest.starts_with("server_") {
        Some(Category::Server)
    } else if rest.starts_with("license_") {
        Some(Category::License)
    } else {
        None
    }
}
