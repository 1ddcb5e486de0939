// ── Dynamic entity reconciler ──
//
// Converges the persisted registry on the entity set a snapshot calls
// for: missing entities and devices are created, entities of vanished
// records are removed, then devices left without entities are removed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};
use veeamly_api::Capabilities;

use crate::entity::{Category, category_of_unique_id, descriptors, desired_entities};
use crate::error::CoreError;
use crate::model::Snapshot;
use crate::registry::{DeviceEntry, EntityRegistry, RegistryEntry};

/// What one reconciliation pass changed, by unique id / device id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub created: Vec<String>,
    pub removed: Vec<String>,
    pub devices_created: Vec<String>,
    pub devices_removed: Vec<String>,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.created.is_empty()
            && self.removed.is_empty()
            && self.devices_created.is_empty()
            && self.devices_removed.is_empty()
    }
}

/// Reconciles one entry's registrations against snapshots.
pub struct Reconciler {
    entry_id: String,
    registry: Arc<dyn EntityRegistry>,
    capabilities: Capabilities,
    /// Serializes passes so two snapshots never interleave.
    running: Mutex<()>,
}

impl Reconciler {
    pub fn new(
        entry_id: impl Into<String>,
        registry: Arc<dyn EntityRegistry>,
        capabilities: Capabilities,
    ) -> Self {
        Self {
            entry_id: entry_id.into(),
            registry,
            capabilities,
            running: Mutex::new(()),
        }
    }

    pub fn entry_id(&self) -> &str {
        &self.entry_id
    }

    pub fn registry(&self) -> &Arc<dyn EntityRegistry> {
        &self.registry
    }

    /// One pass. Running it twice on the same snapshot changes nothing
    /// the second time.
    ///
    /// Stale detection reads the registry itself, so entities created by
    /// an earlier process are cleaned up as well. Server and license
    /// entities are never removed here, nor are entities of a category
    /// whose read failed in this snapshot.
    pub async fn reconcile(&self, snapshot: &Snapshot) -> Result<ReconcileReport, CoreError> {
        let _running = self.running.lock().await;
        let result = self.converge(snapshot).await;
        // Persist whatever was applied, even when the pass stopped early.
        let flushed = self.registry.flush().await;
        let report = result?;
        flushed?;
        Ok(report)
    }

    async fn converge(&self, snapshot: &Snapshot) -> Result<ReconcileReport, CoreError> {
        let mut report = ReconcileReport::default();

        let desired = desired_entities(&self.entry_id, snapshot, &self.capabilities);
        let existing = self.registry.entries(&self.entry_id).await?;
        let existing_ids: HashSet<&str> = existing.iter().map(|e| e.unique_id.as_str()).collect();
        let devices: HashMap<String, DeviceEntry> = self
            .registry
            .devices(&self.entry_id)
            .await?
            .into_iter()
            .map(|d| (d.device_id.clone(), d))
            .collect();

        // ── Additions ────────────────────────────────────────────────
        let mut seen_devices: HashSet<&str> = HashSet::new();
        for entity in &desired {
            let device_id = entity.device.device_id.as_str();
            if seen_devices.insert(device_id) {
                let wanted = DeviceEntry {
                    device_id: device_id.to_owned(),
                    entry_id: self.entry_id.clone(),
                    name: entity.device.name.clone(),
                    model: entity.device.model.to_owned(),
                };
                match devices.get(device_id) {
                    None => {
                        self.registry.add_device(wanted).await?;
                        info!(device_id, "device created");
                        report.devices_created.push(device_id.to_owned());
                    }
                    Some(current) if *current != wanted => {
                        debug!(device_id, name = %wanted.name, "device metadata updated");
                        self.registry.add_device(wanted).await?;
                    }
                    Some(_) => {}
                }
            }

            if !existing_ids.contains(entity.unique_id.as_str()) {
                self.registry
                    .add_entry(RegistryEntry {
                        entity_id: entity.entity_id.clone(),
                        unique_id: entity.unique_id.clone(),
                        entry_id: self.entry_id.clone(),
                        device_id: device_id.to_owned(),
                        platform: entity.descriptor.platform,
                        name: entity.name.clone(),
                    })
                    .await?;
                info!(entity_id = %entity.entity_id, "entity created");
                report.created.push(entity.unique_id.clone());
            }
        }

        // ── Stale entities ───────────────────────────────────────────
        let live = self.live_unique_ids(snapshot);
        for entry in &existing {
            let Some(category) = category_of_unique_id(&self.entry_id, &entry.unique_id) else {
                continue;
            };
            if matches!(category, Category::Server | Category::License)
                || snapshot.diagnostics.section_failed(category)
                || live.contains(entry.unique_id.as_str())
            {
                continue;
            }
            self.registry.remove_entry(&entry.unique_id).await?;
            info!(entity_id = %entry.entity_id, %category, "stale entity removed");
            report.removed.push(entry.unique_id.clone());
        }

        // ── Orphaned devices ─────────────────────────────────────────
        let referenced: HashSet<String> = self
            .registry
            .entries(&self.entry_id)
            .await?
            .into_iter()
            .map(|e| e.device_id)
            .collect();
        let mut orphaned: Vec<&String> = devices
            .keys()
            .filter(|id| !referenced.contains(*id) && !seen_devices.contains(id.as_str()))
            .collect();
        orphaned.sort();
        for device_id in orphaned {
            self.registry
                .remove_device(&self.entry_id, device_id)
                .await?;
            info!(device_id = %device_id, "orphaned device removed");
            report.devices_removed.push(device_id.clone());
        }

        if !report.is_noop() {
            debug!(
                created = report.created.len(),
                removed = report.removed.len(),
                devices_created = report.devices_created.len(),
                devices_removed = report.devices_removed.len(),
                "reconciled"
            );
        }
        Ok(report)
    }

    /// Every unique id a record present in `snapshot` could own, including
    /// buttons the current API version leaves out.
    fn live_unique_ids(&self, snapshot: &Snapshot) -> HashSet<String> {
        snapshot
            .source_keys()
            .into_iter()
            .filter(|source| !source.is_singleton())
            .flat_map(|source| {
                descriptors(source.category())
                    .iter()
                    .map(move |d| source.unique_id(&self.entry_id, d.suffix))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}
