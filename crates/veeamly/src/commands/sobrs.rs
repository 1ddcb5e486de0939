//! Scale-out repository command handlers.

use tabled::Tabled;
use veeamly_core::{Action, Controller, Extent, ScaleOutRepository};

use crate::cli::{ExtentTarget, GlobalOpts, SobrsArgs, SobrsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct SobrRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Extents")]
    extents: usize,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&ScaleOutRepository> for SobrRow {
    fn from(s: &ScaleOutRepository) -> Self {
        Self {
            id: s.id.clone(),
            name: s.name.clone(),
            extents: s.extents.len(),
            description: output::or_dash(s.description.as_deref()),
        }
    }
}

#[derive(Tabled)]
struct ExtentRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&Extent> for ExtentRow {
    fn from(e: &Extent) -> Self {
        Self {
            id: e.id.clone(),
            name: e.name.clone(),
            status: if e.status.is_empty() {
                "normal".into()
            } else {
                e.status.join(", ")
            },
        }
    }
}

/// The mode switch a subcommand asks for.
#[derive(Debug, Clone, Copy)]
enum Switch {
    Seal,
    Unseal,
    MaintenanceOn,
    MaintenanceOff,
}

impl Switch {
    fn action(self, sobr_id: String, extent_id: String) -> Action {
        match self {
            Self::Seal => Action::EnableExtentSealedMode { sobr_id, extent_id },
            Self::Unseal => Action::DisableExtentSealedMode { sobr_id, extent_id },
            Self::MaintenanceOn => Action::EnableExtentMaintenanceMode { sobr_id, extent_id },
            Self::MaintenanceOff => Action::DisableExtentMaintenanceMode { sobr_id, extent_id },
        }
    }

    /// Prompt text for switches that take the extent out of rotation.
    fn prompt(self, extent: &str) -> Option<String> {
        match self {
            Self::Seal => Some(format!("Seal extent '{extent}'? No new backups will land on it.")),
            Self::MaintenanceOn => Some(format!("Put extent '{extent}' into maintenance mode?")),
            Self::Unseal | Self::MaintenanceOff => None,
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: SobrsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let snapshot = util::snapshot(controller).await?;

    let (switch, target) = match args.command {
        SobrsCommand::List => {
            let out = output::render_list(
                &global.output,
                &snapshot.sobrs,
                |s| SobrRow::from(s),
                |s| s.id.clone(),
            );
            output::print_output(&out, global.quiet);
            return Ok(());
        }
        SobrsCommand::Extents { sobr } => {
            let sobr = util::resolve_sobr(&snapshot, &sobr)?;
            let out = output::render_list(
                &global.output,
                &sobr.extents,
                |e| ExtentRow::from(e),
                |e| e.id.clone(),
            );
            output::print_output(&out, global.quiet);
            return Ok(());
        }
        SobrsCommand::Seal(target) => (Switch::Seal, target),
        SobrsCommand::Unseal(target) => (Switch::Unseal, target),
        SobrsCommand::MaintenanceOn(target) => (Switch::MaintenanceOn, target),
        SobrsCommand::MaintenanceOff(target) => (Switch::MaintenanceOff, target),
    };

    let ExtentTarget { sobr, extent } = target;
    let (sobr, extent) = util::resolve_extent(&snapshot, &sobr, &extent)?;
    let prompt = switch.prompt(&extent.name);
    let action = switch.action(sobr.id.clone(), extent.id.clone());
    super::run_action(controller, action, prompt.as_deref(), global).await
}
