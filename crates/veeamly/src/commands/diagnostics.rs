//! Diagnostics report handler.

use veeamly_core::{Controller, DiagnosticsReport};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

fn counts(map: &std::collections::BTreeMap<String, usize>) -> String {
    if map.is_empty() {
        return "-".into();
    }
    map.iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn detail(r: &DiagnosticsReport) -> String {
    output::detail_block(&[
        ("Entry", r.entry.entry_id.clone()),
        ("Server", r.entry.title.clone()),
        ("Username", r.entry.username.to_owned()),
        ("Verify TLS", output::flag(Some(r.entry.verify_tls))),
        ("API version", r.entry.api_version.clone()),
        ("Polls", r.coordinator.polls.to_string()),
        ("Last update ok", output::flag(Some(r.coordinator.last_update_success))),
        ("Last error", output::or_dash(r.coordinator.last_error.as_deref())),
        ("Token expiry", output::when(r.session.expires_at)),
        ("Jobs", r.data.jobs.to_string()),
        ("Repositories", r.data.repositories.to_string()),
        ("Scale-out repos", r.data.sobrs.to_string()),
        ("Extents", r.data.extents.to_string()),
        ("Jobs by status", counts(&r.jobs_summary)),
        ("Repos by type", counts(&r.repositories_summary)),
        (
            "Build",
            output::or_dash(r.server.as_ref().and_then(|s| s.build_version.as_deref())),
        ),
        (
            "License",
            output::or_dash(r.license.as_ref().and_then(|l| l.status.as_deref())),
        ),
    ])
}

pub async fn handle(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    let report = controller.diagnostics().await?;
    let out = output::render_single(&global.output, &report, detail, |r| {
        r.entry.entry_id.clone()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
