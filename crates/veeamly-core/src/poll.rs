// ── Fetch-and-normalize ──
//
// One poll cycle: obtain a session, read every section, normalize into a
// `Snapshot`. Jobs are mandatory; everything else is best-effort.

use std::collections::HashMap;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::Backend;
use crate::entity::Category;
use crate::error::CoreError;
use crate::model::{Diagnostics, Repository, ScaleOutRepository, Snapshot};
use crate::normalize::{
    identifier_value, job_from_value, license_from_value, repository_from_parts,
    server_info_from_value, sobr_from_value,
};
use crate::session::SessionManager;

/// Run one poll cycle.
///
/// Fails fast on session errors and on a failed jobs read; any other
/// section that fails is logged, left empty and named in
/// `diagnostics.failed_sections`. A 401 on any read drops the session.
pub async fn poll(backend: &dyn Backend, sessions: &SessionManager) -> Result<Snapshot, CoreError> {
    let session = sessions.ensure_session().await?;

    let raw_jobs = match backend.fetch_jobs(&session).await {
        Ok(raw) => raw,
        Err(e) => {
            if e.is_auth() {
                // The server revoked the token; the next cycle logs in again.
                sessions.invalidate().await;
            }
            return Err(CoreError::UpdateFailed {
                message: format!("failed to fetch jobs: {e}"),
            });
        }
    };
    let jobs = normalize_each("job", &raw_jobs, job_from_value);

    let (server, license, repos, states, sobrs) = tokio::join!(
        backend.fetch_server_info(&session),
        backend.fetch_license(&session),
        backend.fetch_repositories(&session),
        backend.fetch_repository_states(&session),
        backend.fetch_scale_out_repositories(&session),
    );

    let failed_sections: Vec<Category> = [
        (Category::Server, server.is_err()),
        (Category::License, license.is_err()),
        (Category::Repository, repos.is_err() || states.is_err()),
        (Category::Extent, sobrs.is_err()),
    ]
    .into_iter()
    .filter_map(|(category, failed)| failed.then_some(category))
    .collect();

    let rejected = [
        server.as_ref().err(),
        license.as_ref().err(),
        repos.as_ref().err(),
        states.as_ref().err(),
        sobrs.as_ref().err(),
    ]
    .into_iter()
    .flatten()
    .any(CoreError::is_auth);
    if rejected {
        sessions.invalidate().await;
    }

    let server_info = best_effort("server info", server)
        .and_then(|v| parse_or_warn("server info", server_info_from_value(&v)));
    let license_info = best_effort("license", license)
        .and_then(|v| parse_or_warn("license", license_from_value(&v)));
    let repositories = merge_repositories(
        best_effort("repositories", repos).unwrap_or_default(),
        best_effort("repository states", states).unwrap_or_default(),
    );
    let sobrs: Vec<ScaleOutRepository> = best_effort("scale-out repositories", sobrs)
        .map(|raw| normalize_each("scale-out repository", &raw, sobr_from_value))
        .unwrap_or_default();

    debug!(
        jobs = jobs.len(),
        repositories = repositories.len(),
        sobrs = sobrs.len(),
        server_info = server_info.is_some(),
        license = license_info.is_some(),
        "poll complete"
    );

    Ok(Snapshot {
        jobs,
        repositories,
        sobrs,
        server_info,
        license_info,
        diagnostics: Diagnostics {
            connected: true,
            health_ok: true,
            last_successful_poll: Some(Utc::now()),
            failed_sections,
        },
    })
}

fn best_effort<T>(section: &'static str, result: Result<T, CoreError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            let err = CoreError::PartialFetch {
                section,
                message: e.to_string(),
            };
            warn!(error = %err, "continuing without section");
            None
        }
    }
}

fn parse_or_warn<T>(section: &'static str, result: Result<T, CoreError>) -> Option<T> {
    result
        .map_err(|e| warn!(section, error = %e, "skipping record"))
        .ok()
}

fn normalize_each<T>(
    section: &'static str,
    raw: &[Value],
    convert: impl Fn(&Value) -> Result<T, CoreError>,
) -> Vec<T> {
    raw.iter()
        .filter_map(|v| parse_or_warn(section, convert(v)))
        .collect()
}

/// Union of configuration and state records keyed by id.
///
/// Order follows the state listing, then configuration-only repositories.
fn merge_repositories(configs: Vec<Value>, states: Vec<Value>) -> Vec<Repository> {
    let mut configs_by_id: HashMap<String, Value> = HashMap::new();
    let mut config_order = Vec::new();
    for config in configs {
        let Some(id) = identifier_value(config.get("id")) else {
            warn!(section = "repository", "skipping record without id");
            continue;
        };
        config_order.push(id.clone());
        configs_by_id.insert(id, config);
    }

    let mut merged = Vec::new();
    for state in &states {
        let config = identifier_value(state.get("id")).and_then(|id| configs_by_id.remove(&id));
        merged.extend(parse_or_warn(
            "repository",
            repository_from_parts(config.as_ref(), Some(state)),
        ));
    }
    for config in config_order
        .iter()
        .filter_map(|id| configs_by_id.remove(id))
    {
        merged.extend(parse_or_warn(
            "repository",
            repository_from_parts(Some(&config), None),
        ));
    }
    merged
}
