// ── Entity catalogue ──
//
// The fixed set of sensors, binary sensors and buttons each record
// category materializes, and the computation of the desired entity set
// for one snapshot.

use serde::{Deserialize, Serialize};
use strum::Display;
use veeamly_api::{Capabilities, Capability};

use super::key::{Category, SourceKey};
use crate::model::Snapshot;

/// Kind of entity, in the vocabulary of home-automation registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Sensor,
    BinarySensor,
    Button,
}

/// Static description of one entity within a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDescriptor {
    /// Last component of the unique id.
    pub suffix: &'static str,
    /// Friendly name.
    pub name: &'static str,
    pub platform: Platform,
    /// Write capability the entity needs; buttons only.
    pub requires: Option<Capability>,
}

const fn sensor(suffix: &'static str, name: &'static str) -> EntityDescriptor {
    EntityDescriptor {
        suffix,
        name,
        platform: Platform::Sensor,
        requires: None,
    }
}

const fn binary(suffix: &'static str, name: &'static str) -> EntityDescriptor {
    EntityDescriptor {
        suffix,
        name,
        platform: Platform::BinarySensor,
        requires: None,
    }
}

const fn button(
    suffix: &'static str,
    name: &'static str,
    requires: Capability,
) -> EntityDescriptor {
    EntityDescriptor {
        suffix,
        name,
        platform: Platform::Button,
        requires: Some(requires),
    }
}

const JOB: &[EntityDescriptor] = &[
    sensor("status", "Status"),
    sensor("type", "Type"),
    sensor("last_run", "Last Run"),
    sensor("next_run", "Next Run"),
    button("start", "Start", Capability::JobControl),
    button("stop", "Stop", Capability::JobControl),
    button("retry", "Retry", Capability::JobControl),
    button("enable", "Enable", Capability::JobToggle),
    button("disable", "Disable", Capability::JobToggle),
];

const REPOSITORY: &[EntityDescriptor] = &[
    sensor("type", "Type"),
    sensor("description", "Description"),
    sensor("capacity", "Capacity"),
    sensor("free_space", "Free Space"),
    sensor("used_space", "Used Space"),
    sensor("used_space_percent", "Used Space %"),
    binary("online", "Online"),
    binary("out_of_date", "Out of Date"),
    binary("immutable", "Immutable"),
    binary("object_lock", "Object Lock"),
    binary("hardened", "Hardened"),
    binary("accessible", "Accessible"),
    binary("mounted", "Mounted"),
    binary("capacity_warning", "Capacity Warning"),
    binary("capacity_critical", "Capacity Critical"),
    button("rescan", "Rescan", Capability::RepositoryRescan),
];

const EXTENT: &[EntityDescriptor] = &[
    button(
        "enable_sealed_mode",
        "Enable Sealed Mode",
        Capability::ExtentSealedMode,
    ),
    button(
        "disable_sealed_mode",
        "Disable Sealed Mode",
        Capability::ExtentSealedMode,
    ),
    button(
        "enable_maintenance_mode",
        "Enable Maintenance Mode",
        Capability::ExtentMaintenanceMode,
    ),
    button(
        "disable_maintenance_mode",
        "Disable Maintenance Mode",
        Capability::ExtentMaintenanceMode,
    ),
];

const SERVER: &[EntityDescriptor] = &[
    sensor("build_version", "Build Version"),
    sensor("server_name", "Server Name"),
    sensor("platform", "Platform"),
    sensor("database_vendor", "Database Vendor"),
    sensor("sql_edition", "SQL Edition"),
    sensor("sql_version", "SQL Version"),
    sensor("last_successful_poll", "Last Successful Poll"),
    binary("health_ok", "Health OK"),
    binary("connected", "Connected"),
];

const LICENSE: &[EntityDescriptor] = &[
    sensor("status", "Status"),
    sensor("edition", "Edition"),
    sensor("type", "Type"),
    sensor("expiration", "Expiration"),
    sensor("support_expiration", "Support Expiration"),
    sensor("licensed_to", "Licensed To"),
    sensor("support_id", "Support ID"),
    binary("auto_update", "Auto Update"),
    sensor("cloud_connect", "Cloud Connect"),
];

/// All descriptors of one category.
pub fn descriptors(category: Category) -> &'static [EntityDescriptor] {
    match category {
        Category::Job => JOB,
        Category::Repository => REPOSITORY,
        Category::Extent => EXTENT,
        Category::Server => SERVER,
        Category::License => LICENSE,
    }
}

pub fn descriptor(category: Category, suffix: &str) -> Option<&'static EntityDescriptor> {
    descriptors(category).iter().find(|d| d.suffix == suffix)
}

/// Device grouping for a set of entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSpec {
    pub device_id: String,
    pub name: String,
    pub model: &'static str,
}

/// One entity the current snapshot calls for.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredEntity {
    pub source: SourceKey,
    pub descriptor: &'static EntityDescriptor,
    pub unique_id: String,
    pub entity_id: String,
    /// Friendly name, prefixed with the extent name for extent buttons.
    pub name: String,
    pub device: DeviceSpec,
}

/// Device metadata for a source, if its record is in the snapshot.
pub fn device_spec(entry_id: &str, snapshot: &Snapshot, source: &SourceKey) -> Option<DeviceSpec> {
    let (name, model) = match source {
        SourceKey::Job(id) => (snapshot.job(id)?.name.clone(), "Backup Job"),
        SourceKey::Repository(id) => (snapshot.repository(id)?.name.clone(), "Backup Repository"),
        SourceKey::Extent { sobr_id, .. } => (
            snapshot.sobr(sobr_id)?.name.clone(),
            "Scale-Out Backup Repository",
        ),
        SourceKey::Server => (
            snapshot
                .server_info
                .as_ref()?
                .name
                .clone()
                .unwrap_or_else(|| "Veeam Backup Server".into()),
            "Backup & Replication Server",
        ),
        SourceKey::License => {
            snapshot.license_info.as_ref()?;
            ("Veeam License".into(), "License")
        }
    };
    Some(DeviceSpec {
        device_id: source.device_id(entry_id),
        name,
        model,
    })
}

/// The full entity set for `snapshot`, in catalogue order.
///
/// Buttons whose capability the API version lacks are left out.
pub fn desired_entities(
    entry_id: &str,
    snapshot: &Snapshot,
    capabilities: &Capabilities,
) -> Vec<DesiredEntity> {
    let mut desired = Vec::new();

    for source in snapshot.source_keys() {
        let Some(device) = device_spec(entry_id, snapshot, &source) else {
            continue;
        };
        let qualifier = match &source {
            SourceKey::Extent { sobr_id, extent_id } => snapshot
                .sobr(sobr_id)
                .and_then(|s| s.extent(extent_id))
                .map(|e| e.name.clone()),
            _ => None,
        };

        for descriptor in descriptors(source.category()) {
            if descriptor
                .requires
                .is_some_and(|cap| !capabilities.supports(cap))
            {
                continue;
            }
            let name = match &qualifier {
                Some(q) => format!("{q} {}", descriptor.name),
                None => descriptor.name.to_owned(),
            };
            let entity_id = format!(
                "{}.veeam_{}_{}",
                descriptor.platform,
                slugify(&match &qualifier {
                    Some(q) => format!("{} {q}", device.name),
                    None => device.name.clone(),
                }),
                descriptor.suffix
            );
            desired.push(DesiredEntity {
                unique_id: source.unique_id(entry_id, descriptor.suffix),
                entity_id,
                name,
                descriptor,
                device: device.clone(),
                source: source.clone(),
            });
        }
    }

    desired
}

/// Lowercase, alphanumerics kept, everything else collapsed to `_`.
pub fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('_') && !slug.is_empty() {
            slug.push('_');
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("unnamed");
    }
    slug
}
