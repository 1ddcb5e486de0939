// In-memory registry backed by `DashMap`.

use async_trait::async_trait;
use dashmap::DashMap;

use super::{DeviceEntry, EntityRegistry, RegistryEntry};
use crate::error::CoreError;

/// Volatile registry, for tests and one-shot runs.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    entries: DashMap<String, RegistryEntry>,
    devices: DashMap<(String, String), DeviceEntry>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn contains(&self, unique_id: &str) -> bool {
        self.entries.contains_key(unique_id)
    }
}

#[async_trait]
impl EntityRegistry for MemoryRegistry {
    async fn entries(&self, entry_id: &str) -> Result<Vec<RegistryEntry>, CoreError> {
        let mut entries: Vec<RegistryEntry> = self
            .entries
            .iter()
            .filter(|e| e.entry_id == entry_id)
            .map(|e| e.value().clone())
            .collect();
        entries.sort_by(|a, b| a.unique_id.cmp(&b.unique_id));
        Ok(entries)
    }

    async fn add_entry(&self, entry: RegistryEntry) -> Result<(), CoreError> {
        self.entries.insert(entry.unique_id.clone(), entry);
        Ok(())
    }

    async fn remove_entry(&self, unique_id: &str) -> Result<(), CoreError> {
        self.entries.remove(unique_id);
        Ok(())
    }

    async fn devices(&self, entry_id: &str) -> Result<Vec<DeviceEntry>, CoreError> {
        let mut devices: Vec<DeviceEntry> = self
            .devices
            .iter()
            .filter(|d| d.entry_id == entry_id)
            .map(|d| d.value().clone())
            .collect();
        devices.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        Ok(devices)
    }

    async fn add_device(&self, device: DeviceEntry) -> Result<(), CoreError> {
        self.devices
            .insert((device.entry_id.clone(), device.device_id.clone()), device);
        Ok(())
    }

    async fn remove_device(&self, entry_id: &str, device_id: &str) -> Result<(), CoreError> {
        self.devices
            .remove(&(entry_id.to_owned(), device_id.to_owned()));
        Ok(())
    }
}
