//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::sync::Arc;

use veeamly_core::{Controller, Extent, Job, Repository, ScaleOutRepository, Snapshot};

use crate::error::CliError;

/// The snapshot of the poll cycle this invocation ran.
pub async fn snapshot(controller: &Controller) -> Result<Arc<Snapshot>, CliError> {
    controller
        .snapshot()
        .await
        .ok_or_else(|| CliError::UpdateFailed {
            message: "no data received from the server".into(),
        })
}

fn not_found(resource_type: &str, identifier: &str, list_command: &str) -> CliError {
    CliError::NotFound {
        resource_type: resource_type.into(),
        identifier: identifier.into(),
        list_command: list_command.into(),
    }
}

/// Match by id first, then by case-insensitive name.
fn lookup<'a, T>(
    items: &'a [T],
    identifier: &str,
    id: impl Fn(&T) -> &str,
    name: impl Fn(&T) -> &str,
) -> Option<&'a T> {
    let wanted = identifier.to_ascii_lowercase();
    items
        .iter()
        .find(|item| id(item).eq_ignore_ascii_case(&wanted))
        .or_else(|| items.iter().find(|item| name(item).eq_ignore_ascii_case(identifier)))
}

pub fn resolve_job<'a>(snapshot: &'a Snapshot, identifier: &str) -> Result<&'a Job, CliError> {
    lookup(&snapshot.jobs, identifier, |j| &j.id, |j| &j.name)
        .ok_or_else(|| not_found("job", identifier, "jobs list"))
}

pub fn resolve_repository<'a>(
    snapshot: &'a Snapshot,
    identifier: &str,
) -> Result<&'a Repository, CliError> {
    lookup(&snapshot.repositories, identifier, |r| &r.id, |r| &r.name)
        .ok_or_else(|| not_found("repository", identifier, "repos list"))
}

pub fn resolve_sobr<'a>(
    snapshot: &'a Snapshot,
    identifier: &str,
) -> Result<&'a ScaleOutRepository, CliError> {
    lookup(&snapshot.sobrs, identifier, |s| &s.id, |s| &s.name)
        .ok_or_else(|| not_found("scale-out repository", identifier, "sobrs list"))
}

pub fn resolve_extent<'a>(
    snapshot: &'a Snapshot,
    sobr: &str,
    extent: &str,
) -> Result<(&'a ScaleOutRepository, &'a Extent), CliError> {
    let sobr = resolve_sobr(snapshot, sobr)?;
    let found = lookup(&sobr.extents, extent, |e| &e.id, |e| &e.name).ok_or_else(|| {
        not_found("extent", extent, &format!("sobrs extents {}", sobr.id))
    })?;
    Ok((sobr, found))
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}
