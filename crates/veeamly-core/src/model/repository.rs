// ── Repository domain type ──

use serde::{Deserialize, Serialize};

use super::Extra;

/// Free-space ratio below which a repository raises a capacity warning.
pub const CAPACITY_WARNING_FREE_PCT: f64 = 15.0;
/// Free-space ratio below which a repository is critical.
pub const CAPACITY_CRITICAL_FREE_PCT: f64 = 5.0;

/// A backup repository: configuration merged with runtime state.
///
/// Capacity figures come from the states endpoint, description and
/// immutability from the configuration endpoint. Booleans the server
/// does not report stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub repo_type: Option<String>,
    pub unique_id: Option<String>,
    pub capacity_gb: Option<f64>,
    pub free_gb: Option<f64>,
    pub used_space_gb: Option<f64>,
    pub is_online: Option<bool>,
    pub is_out_of_date: Option<bool>,
    pub is_immutable: Option<bool>,
    pub immutability_days: Option<u32>,
    pub is_object_lock: Option<bool>,
    pub is_hardened: Option<bool>,
    pub is_mounted: Option<bool>,
    /// Mirrors `is_online`; VBR exposes no separate reachability probe.
    pub is_accessible: Option<bool>,
    #[serde(default, skip_serializing_if = "Extra::is_empty")]
    pub extra: Extra,
}

impl Repository {
    /// Used space as a percentage of capacity, rounded to one decimal.
    pub fn used_percent(&self) -> Option<f64> {
        let capacity = self.capacity_gb.filter(|c| *c > 0.0)?;
        let used = self.used_space_gb?;
        Some((used / capacity * 1000.0).round() / 10.0)
    }

    /// Free space as a percentage of capacity.
    pub fn free_percent(&self) -> Option<f64> {
        let capacity = self.capacity_gb.filter(|c| *c > 0.0)?;
        let free = self.free_gb?;
        Some(free / capacity * 100.0)
    }

    /// Less than 15% free.
    pub fn capacity_warning(&self) -> Option<bool> {
        self.free_percent().map(|p| p < CAPACITY_WARNING_FREE_PCT)
    }

    /// Less than 5% free.
    pub fn capacity_critical(&self) -> Option<bool> {
        self.free_percent().map(|p| p < CAPACITY_CRITICAL_FREE_PCT)
    }
}
