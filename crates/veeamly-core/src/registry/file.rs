// JSON-file registry
//
// The whole registry lives in one pretty-printed JSON document held in
// memory. Mutations only mark it dirty; `flush` rewrites the file through
// a temporary file and a rename, so a crash leaves either the old or the
// new version on disk. A failed flush keeps the document dirty and the
// next flush retries.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::{DeviceEntry, EntityRegistry, RegistryEntry};
use crate::error::CoreError;

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    entities: BTreeMap<String, RegistryEntry>,
    #[serde(default)]
    devices: Vec<DeviceEntry>,
}

/// Registry persisted as a JSON file.
#[derive(Debug)]
pub struct FileRegistry {
    path: PathBuf,
    state: Mutex<State>,
}

#[derive(Debug)]
struct State {
    document: RegistryDocument,
    dirty: bool,
}

impl FileRegistry {
    /// Load the registry at `path`; a missing file is an empty registry.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let path = path.into();
        let document = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| CoreError::Registry {
                message: format!("{} is not a valid registry file: {e}", path.display()),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RegistryDocument::default(),
            Err(e) => {
                return Err(CoreError::Registry {
                    message: format!("cannot read {}: {e}", path.display()),
                });
            }
        };
        Ok(Self {
            path,
            state: Mutex::new(State {
                document,
                dirty: false,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether mutations are waiting for a flush.
    pub async fn is_dirty(&self) -> bool {
        self.state.lock().await.dirty
    }

    async fn persist(&self, document: &RegistryDocument) -> Result<(), CoreError> {
        let io_err = |e: std::io::Error| CoreError::Registry {
            message: format!("cannot write {}: {e}", self.path.display()),
        };
        let bytes = serde_json::to_vec_pretty(document).map_err(|e| CoreError::Registry {
            message: format!("cannot serialize registry: {e}"),
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        debug!(path = %self.path.display(), "registry saved");
        Ok(())
    }
}

#[async_trait]
impl EntityRegistry for FileRegistry {
    async fn entries(&self, entry_id: &str) -> Result<Vec<RegistryEntry>, CoreError> {
        let state = self.state.lock().await;
        Ok(state
            .document
            .entities
            .values()
            .filter(|e| e.entry_id == entry_id)
            .cloned()
            .collect())
    }

    async fn add_entry(&self, entry: RegistryEntry) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;
        state.document.entities.insert(entry.unique_id.clone(), entry);
        state.dirty = true;
        Ok(())
    }

    async fn remove_entry(&self, unique_id: &str) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;
        if state.document.entities.remove(unique_id).is_some() {
            state.dirty = true;
        }
        Ok(())
    }

    async fn devices(&self, entry_id: &str) -> Result<Vec<DeviceEntry>, CoreError> {
        let state = self.state.lock().await;
        let mut devices: Vec<DeviceEntry> = state
            .document
            .devices
            .iter()
            .filter(|d| d.entry_id == entry_id)
            .cloned()
            .collect();
        devices.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        Ok(devices)
    }

    async fn add_device(&self, device: DeviceEntry) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;
        state
            .document
            .devices
            .retain(|d| !(d.entry_id == device.entry_id && d.device_id == device.device_id));
        state.document.devices.push(device);
        state.dirty = true;
        Ok(())
    }

    async fn remove_device(&self, entry_id: &str, device_id: &str) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;
        let before = state.document.devices.len();
        state
            .document
            .devices
            .retain(|d| !(d.entry_id == entry_id && d.device_id == device_id));
        if state.document.devices.len() != before {
            state.dirty = true;
        }
        Ok(())
    }

    async fn flush(&self) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;
        if !state.dirty {
            return Ok(());
        }
        self.persist(&state.document).await?;
        state.dirty = false;
        Ok(())
    }
}
