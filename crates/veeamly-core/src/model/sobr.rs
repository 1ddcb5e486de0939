// ── Scale-out repository domain types ──

use serde::{Deserialize, Serialize};

/// A scale-out backup repository and its performance extents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScaleOutRepository {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub unique_id: Option<String>,
    /// Extents in server order.
    pub extents: Vec<Extent>,
}

impl ScaleOutRepository {
    pub fn extent(&self, extent_id: &str) -> Option<&Extent> {
        self.extents.iter().find(|e| e.id == extent_id)
    }
}

/// One physical repository backing a SOBR.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extent {
    pub id: String,
    pub name: String,
    /// Status flags as reported (`Sealed`, `MaintenanceMode`, ...).
    pub status: Vec<String>,
}

impl Extent {
    /// Case-insensitive status flag check.
    pub fn has_status(&self, flag: &str) -> bool {
        self.status.iter().any(|s| s.eq_ignore_ascii_case(flag))
    }

    pub fn is_sealed(&self) -> bool {
        self.has_status("sealed")
    }

    pub fn in_maintenance(&self) -> bool {
        self.has_status("maintenancemode")
    }
}
