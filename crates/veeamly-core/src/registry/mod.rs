// ── Entity registry seam ──
//
// The persisted record of which entities and devices exist. The
// reconciler reads and writes it; it never keeps its own history.

mod file;
mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::entity::Platform;
use crate::error::CoreError;

pub use file::FileRegistry;
pub use memory::MemoryRegistry;

/// One registered entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub entity_id: String,
    pub unique_id: String,
    pub entry_id: String,
    pub device_id: String,
    pub platform: Platform,
    #[serde(default)]
    pub name: String,
}

/// One registered device, scoped to an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub device_id: String,
    pub entry_id: String,
    pub name: String,
    pub model: String,
}

/// Storage for entity and device registrations.
///
/// Listing methods return registrations in a stable order (by unique id
/// and device id respectively).
#[async_trait]
pub trait EntityRegistry: Send + Sync {
    async fn entries(&self, entry_id: &str) -> Result<Vec<RegistryEntry>, CoreError>;

    /// Insert or replace, keyed by `unique_id`.
    async fn add_entry(&self, entry: RegistryEntry) -> Result<(), CoreError>;

    /// Removing an unknown id is not an error.
    async fn remove_entry(&self, unique_id: &str) -> Result<(), CoreError>;

    async fn devices(&self, entry_id: &str) -> Result<Vec<DeviceEntry>, CoreError>;

    /// Insert or replace, keyed by (`entry_id`, `device_id`).
    async fn add_device(&self, device: DeviceEntry) -> Result<(), CoreError>;

    async fn remove_device(&self, entry_id: &str, device_id: &str) -> Result<(), CoreError>;

    /// Persist buffered mutations. Stores that write through need not
    /// override this.
    async fn flush(&self) -> Result<(), CoreError> {
        Ok(())
    }
}
