//! Repository command handlers.

use tabled::Tabled;
use veeamly_core::{Action, Controller, Repository};

use crate::cli::{GlobalOpts, ReposArgs, ReposCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct RepositoryRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    repo_type: String,
    #[tabled(rename = "Capacity")]
    capacity: String,
    #[tabled(rename = "Free")]
    free: String,
    #[tabled(rename = "Used %")]
    used_pct: String,
    #[tabled(rename = "Online")]
    online: String,
    #[tabled(rename = "Immutable")]
    immutable: String,
}

impl From<&Repository> for RepositoryRow {
    fn from(r: &Repository) -> Self {
        Self {
            id: r.id.clone(),
            name: r.name.clone(),
            repo_type: output::or_dash(r.repo_type.as_deref()),
            capacity: output::gigabytes(r.capacity_gb),
            free: output::gigabytes(r.free_gb),
            used_pct: r
                .used_percent()
                .map_or_else(|| "-".into(), |p| format!("{p:.1}")),
            online: output::flag(r.is_online),
            immutable: output::flag(r.is_immutable),
        }
    }
}

fn capacity_alert(r: &Repository) -> &'static str {
    match (r.capacity_critical(), r.capacity_warning()) {
        (Some(true), _) => "critical (< 5% free)",
        (_, Some(true)) => "warning (< 15% free)",
        (Some(false), Some(false)) => "ok",
        _ => "-",
    }
}

fn detail(r: &Repository) -> String {
    let mut pairs = vec![
        ("ID", r.id.clone()),
        ("Name", r.name.clone()),
        ("Description", output::or_dash(r.description.as_deref())),
        ("Type", output::or_dash(r.repo_type.as_deref())),
        ("Capacity", output::gigabytes(r.capacity_gb)),
        ("Free", output::gigabytes(r.free_gb)),
        ("Used", output::gigabytes(r.used_space_gb)),
        ("Capacity alert", capacity_alert(r).to_owned()),
        ("Online", output::flag(r.is_online)),
        ("Out of date", output::flag(r.is_out_of_date)),
        ("Immutable", output::flag(r.is_immutable)),
        ("Object lock", output::flag(r.is_object_lock)),
        ("Hardened", output::flag(r.is_hardened)),
        ("Mounted", output::flag(r.is_mounted)),
    ];
    if let Some(days) = r.immutability_days {
        pairs.push(("Immutable for", format!("{days} days")));
    }
    output::detail_block(&pairs)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: ReposArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let snapshot = util::snapshot(controller).await?;

    match args.command {
        ReposCommand::List => {
            let out = output::render_list(
                &global.output,
                &snapshot.repositories,
                |r| RepositoryRow::from(r),
                |r| r.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
        ReposCommand::Get { repo } => {
            let repo = util::resolve_repository(&snapshot, &repo)?;
            let out = output::render_single(&global.output, repo, detail, |r| r.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }
        ReposCommand::Rescan { repo } => {
            let repo = util::resolve_repository(&snapshot, &repo)?;
            let action = Action::RescanRepository {
                id: repo.id.clone(),
            };
            super::run_action(controller, action, None, global).await
        }
    }
}
