// ── Record normalization ──
//
// Turns loosely typed VBR JSON into the domain model. The REST surface
// varies between API revisions: enums arrive as plain strings or as
// `{ "value": ... }` wrappers, timestamps as RFC 3339 strings or epoch
// seconds, and "not set" as null, empty or the literal `Unset`. Every
// helper here absorbs those variations so the model only ever holds
// plain values.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::model::{
    Extent, Extra, Job, LicenseInfo, Repository, ScaleOutRepository, ServerInfo,
};

/// Default for enum-like fields that are absent or unset.
pub const UNKNOWN: &str = "unknown";

// ── Primitive helpers ───────────────────────────────────────────────

fn is_unset(s: &str) -> bool {
    let trimmed = s.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("unset")
}

/// Plain string for an enum-like value, or `default` when not set.
pub fn enum_value(value: Option<&Value>, default: &str) -> String {
    optional_enum(value).unwrap_or_else(|| default.to_owned())
}

/// Like [`enum_value`] but `None` when not set.
pub fn optional_enum(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if is_unset(s) => None,
        Value::String(s) => Some(s.trim().to_owned()),
        Value::Object(obj) => optional_enum(obj.get("value")),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) => None,
    }
}

/// Timestamp from an RFC 3339 string, a naive ISO string (taken as UTC)
/// or epoch seconds.
pub fn timestamp_value(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::String(s) if is_unset(s) => None,
        Value::String(s) => parse_timestamp(s.trim()),
        Value::Number(n) => {
            let secs = n.as_i64().or_else(|| n.as_f64().map(f64_to_secs))?;
            DateTime::from_timestamp(secs, 0)
        }
        Value::Object(obj) => timestamp_value(obj.get("value")),
        _ => None,
    }
}

#[allow(clippy::as_conversions, clippy::cast_possible_truncation)]
fn f64_to_secs(f: f64) -> i64 {
    f.trunc() as i64
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Record identifier: UUIDs are canonicalized, other strings kept as-is.
pub fn identifier_value(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => {
            let trimmed = s.trim();
            Some(match uuid::Uuid::parse_str(trimmed) {
                Ok(id) => id.to_string(),
                Err(_) => trimmed.to_owned(),
            })
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Object(obj) => identifier_value(obj.get("value")),
        _ => None,
    }
}

pub fn bool_value(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "enabled" => Some(true),
            "false" | "no" | "disabled" => Some(false),
            _ => None,
        },
        Value::Object(obj) => bool_value(obj.get("value")),
        _ => None,
    }
}

pub fn f64_value(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Forward-compatible copy of a value: primitives pass through, arrays and
/// objects recurse, nulls and unset sentinels are dropped.
pub fn serialize_value(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().eq_ignore_ascii_case("unset") => None,
        Value::Array(items) => Some(Value::Array(
            items.iter().filter_map(serialize_value).collect(),
        )),
        Value::Object(obj) => Some(Value::Object(
            obj.iter()
                .filter_map(|(k, v)| serialize_value(v).map(|v| (k.clone(), v)))
                .collect(),
        )),
        other => Some(other.clone()),
    }
}

/// Every field of `obj` not listed in `known`, via [`serialize_value`].
pub fn extra_fields(obj: &Map<String, Value>, known: &[&str]) -> Extra {
    obj.iter()
        .filter(|(k, _)| !known.contains(&k.as_str()))
        .filter_map(|(k, v)| serialize_value(v).map(|v| (k.clone(), v)))
        .collect()
}

fn as_object<'a>(
    value: &'a Value,
    section: &'static str,
) -> Result<&'a Map<String, Value>, CoreError> {
    value.as_object().ok_or_else(|| CoreError::RecordParse {
        section,
        message: format!("expected an object, got {}", kind_of(value)),
    })
}

fn require_id(obj: &Map<String, Value>, section: &'static str) -> Result<String, CoreError> {
    identifier_value(obj.get("id")).ok_or_else(|| CoreError::RecordParse {
        section,
        message: "record has no id".into(),
    })
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Follow a dotted path of object keys.
fn path<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    let (first, rest) = keys.split_first()?;
    let mut current = obj.get(*first)?;
    for key in rest {
        current = current.as_object()?.get(*key)?;
    }
    Some(current)
}

// ── Jobs ────────────────────────────────────────────────────────────

const JOB_FIELDS: &[&str] = &[
    "id",
    "name",
    "type",
    "status",
    "lastResult",
    "lastRun",
    "nextRun",
];

/// Normalize one entry of `/api/v1/jobs/states`.
pub fn job_from_value(value: &Value) -> Result<Job, CoreError> {
    let obj = as_object(value, "job")?;
    Ok(Job {
        id: require_id(obj, "job")?,
        name: optional_enum(obj.get("name")).unwrap_or_else(|| "Unknown".into()),
        job_type: enum_value(obj.get("type"), UNKNOWN),
        status: enum_value(obj.get("status"), UNKNOWN).to_lowercase(),
        last_result: enum_value(obj.get("lastResult"), UNKNOWN).to_lowercase(),
        last_run: timestamp_value(obj.get("lastRun")),
        next_run: timestamp_value(obj.get("nextRun")),
        extra: extra_fields(obj, JOB_FIELDS),
    })
}

// ── Repositories ────────────────────────────────────────────────────

const REPOSITORY_FIELDS: &[&str] = &[
    "id",
    "name",
    "description",
    "type",
    "uniqueId",
    "capacityGB",
    "freeGB",
    "usedSpaceGB",
    "isOnline",
    "isOutOfDate",
    "isMounted",
    "isHardened",
    "makeRecentBackupsImmutableDays",
    "immutability",
];

/// Immutability as derived from a repository configuration record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Immutability {
    pub is_immutable: Option<bool>,
    pub days: Option<u32>,
    /// Set when the flag came from object-storage settings.
    pub object_storage: bool,
}

/// Object-storage immutability (`bucket.immutability.isEnabled`, or a
/// top-level `immutability.isEnabled`) wins whenever it is present. Only
/// when it is absent does a hardened repository's
/// `makeRecentBackupsImmutableDays > 0` mark the repository immutable.
pub fn immutability(config: &Map<String, Value>) -> Immutability {
    let object_flag = path(config, &["bucket", "immutability", "isEnabled"])
        .or_else(|| path(config, &["immutability", "isEnabled"]));
    if let Some(enabled) = bool_value(object_flag) {
        let days = f64_value(
            path(config, &["bucket", "immutability", "daysCount"])
                .or_else(|| path(config, &["immutability", "daysCount"])),
        )
        .and_then(days_from_f64);
        return Immutability {
            is_immutable: Some(enabled),
            days,
            object_storage: true,
        };
    }

    let hardened_days = f64_value(
        path(config, &["repository", "makeRecentBackupsImmutableDays"])
            .or_else(|| config.get("makeRecentBackupsImmutableDays")),
    )
    .and_then(days_from_f64)
    .filter(|d| *d > 0);

    match hardened_days {
        Some(days) => Immutability {
            is_immutable: Some(true),
            days: Some(days),
            object_storage: false,
        },
        None => Immutability::default(),
    }
}

#[allow(
    clippy::as_conversions,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn days_from_f64(f: f64) -> Option<u32> {
    (f.is_finite() && f >= 0.0 && f <= f64::from(u32::MAX)).then(|| f.trunc() as u32)
}

/// Merge a repository configuration record with its runtime state.
///
/// Either side may be missing (its endpoint failed or the repository is
/// only present in one listing), but not both.
pub fn repository_from_parts(
    config: Option<&Value>,
    state: Option<&Value>,
) -> Result<Repository, CoreError> {
    let config = config.map(|v| as_object(v, "repository")).transpose()?;
    let state = state.map(|v| as_object(v, "repository state")).transpose()?;

    let id = match (state, config) {
        (Some(s), _) => require_id(s, "repository state")?,
        (None, Some(c)) => require_id(c, "repository")?,
        (None, None) => {
            return Err(CoreError::RecordParse {
                section: "repository",
                message: "neither configuration nor state given".into(),
            });
        }
    };

    // Look a key up in state first, then configuration.
    let field = |key: &str| {
        state
            .and_then(|s| s.get(key))
            .or_else(|| config.and_then(|c| c.get(key)))
    };
    // Configuration first, then state.
    let config_field = |key: &str| {
        config
            .and_then(|c| c.get(key))
            .or_else(|| state.and_then(|s| s.get(key)))
    };

    let repo_type = optional_enum(config_field("type"));
    let immut = config.map(immutability).unwrap_or_default();
    let is_online = bool_value(field("isOnline"));

    let explicit_hardened = bool_value(
        config
            .and_then(|c| path(c, &["repository", "isHardened"]))
            .or_else(|| field("isHardened")),
    );
    let is_hardened = explicit_hardened.or_else(|| {
        let hardened_type = repo_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("LinuxHardened"));
        (hardened_type || (immut.is_immutable == Some(true) && !immut.object_storage))
            .then_some(true)
    });

    let mut extra = Extra::new();
    if let Some(c) = config {
        extra.extend(extra_fields(c, REPOSITORY_FIELDS));
    }
    if let Some(s) = state {
        extra.extend(extra_fields(s, REPOSITORY_FIELDS));
    }
    // Object-storage settings are folded into the typed fields above.
    extra.remove("bucket");

    Ok(Repository {
        id,
        name: optional_enum(field("name")).unwrap_or_else(|| "Unknown Repository".into()),
        description: optional_enum(config_field("description")),
        repo_type,
        unique_id: identifier_value(config_field("uniqueId")),
        capacity_gb: f64_value(field("capacityGB")),
        free_gb: f64_value(field("freeGB")),
        used_space_gb: f64_value(field("usedSpaceGB")),
        is_online,
        is_out_of_date: bool_value(field("isOutOfDate")),
        is_immutable: immut.is_immutable,
        immutability_days: immut.days,
        is_object_lock: immut.object_storage.then_some(immut.is_immutable).flatten(),
        is_hardened,
        is_mounted: bool_value(field("isMounted")),
        is_accessible: is_online,
        extra,
    })
}

// ── Scale-out repositories ──────────────────────────────────────────

/// Normalize one SOBR. Extents come from `extents` or from
/// `performanceTier.performanceExtents`; unparseable extents are
/// skipped with a warning.
pub fn sobr_from_value(value: &Value) -> Result<ScaleOutRepository, CoreError> {
    let obj = as_object(value, "scale-out repository")?;
    let id = require_id(obj, "scale-out repository")?;

    let raw_extents = obj
        .get("extents")
        .or_else(|| path(obj, &["performanceTier", "performanceExtents"]))
        .and_then(Value::as_array);

    let mut extents = Vec::new();
    for raw in raw_extents.into_iter().flatten() {
        match extent_from_value(raw) {
            Ok(extent) => extents.push(extent),
            Err(e) => tracing::warn!(sobr_id = %id, error = %e, "skipping extent"),
        }
    }

    Ok(ScaleOutRepository {
        name: optional_enum(obj.get("name")).unwrap_or_else(|| "Unknown SOBR".into()),
        description: optional_enum(obj.get("description")),
        unique_id: identifier_value(obj.get("uniqueId")),
        extents,
        id,
    })
}

pub fn extent_from_value(value: &Value) -> Result<Extent, CoreError> {
    let obj = as_object(value, "extent")?;
    let status = match obj.get("status") {
        Some(Value::Array(items)) => items.iter().filter_map(|v| optional_enum(Some(v))).collect(),
        other => optional_enum(other).into_iter().collect(),
    };
    Ok(Extent {
        id: require_id(obj, "extent")?,
        name: optional_enum(obj.get("name")).unwrap_or_else(|| "Unknown Extent".into()),
        status,
    })
}

// ── Server and license ──────────────────────────────────────────────

pub fn server_info_from_value(value: &Value) -> Result<ServerInfo, CoreError> {
    let obj = as_object(value, "server info")?;
    let patches = obj
        .get("patches")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|v| optional_enum(Some(v))).collect())
        .unwrap_or_default();
    Ok(ServerInfo {
        vbr_id: identifier_value(obj.get("vbrId")),
        name: optional_enum(obj.get("name")),
        build_version: optional_enum(obj.get("buildVersion")),
        patches,
        platform: optional_enum(obj.get("platform")),
        database_vendor: optional_enum(obj.get("databaseVendor")),
        sql_server_edition: optional_enum(obj.get("sqlServerEdition")),
        sql_server_version: optional_enum(obj.get("sqlServerVersion")),
    })
}

const LICENSE_FIELDS: &[&str] = &[
    "status",
    "edition",
    "type",
    "expirationDate",
    "supportExpirationDate",
    "licensedTo",
    "supportId",
    "autoUpdateEnabled",
    "cloudConnect",
];

pub fn license_from_value(value: &Value) -> Result<LicenseInfo, CoreError> {
    let obj = as_object(value, "license")?;
    Ok(LicenseInfo {
        status: optional_enum(obj.get("status")),
        edition: optional_enum(obj.get("edition")),
        license_type: optional_enum(obj.get("type")),
        expiration_date: timestamp_value(obj.get("expirationDate")),
        support_expiration_date: timestamp_value(obj.get("supportExpirationDate")),
        licensed_to: optional_enum(obj.get("licensedTo")),
        support_id: optional_enum(obj.get("supportId")),
        auto_update_enabled: bool_value(obj.get("autoUpdateEnabled")),
        cloud_connect: optional_enum(obj.get("cloudConnect")),
        extra: extra_fields(obj, LICENSE_FIELDS),
    })
}
