//! Server command handlers.

use serde::Serialize;
use tabled::Tabled;
use veeamly_core::{Capability, Controller, CoordinatorStatus, ServerInfo, TokenInfo};

use crate::cli::{GlobalOpts, ServerArgs, ServerCommand};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

const CAPABILITIES: &[(Capability, &str)] = &[
    (Capability::JobControl, "jobs start / stop / retry"),
    (Capability::JobToggle, "jobs enable / disable"),
    (Capability::RepositoryRescan, "repos rescan"),
    (Capability::ExtentSealedMode, "sobrs seal / unseal"),
    (
        Capability::ExtentMaintenanceMode,
        "sobrs maintenance-on / maintenance-off",
    ),
];

#[derive(Clone, Tabled, Serialize)]
struct CapabilityRow {
    #[tabled(rename = "Capability")]
    capability: String,
    #[tabled(rename = "Commands")]
    commands: &'static str,
    #[tabled(rename = "Supported")]
    supported: bool,
}

#[derive(Serialize)]
struct Health {
    server: String,
    tls: String,
    api_version: String,
    connected: bool,
    health_ok: bool,
    coordinator: CoordinatorStatus,
    session: TokenInfo,
}

fn info_detail(s: &ServerInfo) -> String {
    let patches = if s.patches.is_empty() {
        "-".to_owned()
    } else {
        s.patches.join(", ")
    };
    output::detail_block(&[
        ("Name", output::or_dash(s.name.as_deref())),
        ("VBR ID", output::or_dash(s.vbr_id.as_deref())),
        ("Build", output::or_dash(s.build_version.as_deref())),
        ("Patches", patches),
        ("Platform", output::or_dash(s.platform.as_deref())),
        ("Database", output::or_dash(s.database_vendor.as_deref())),
        ("SQL edition", output::or_dash(s.sql_server_edition.as_deref())),
        ("SQL version", output::or_dash(s.sql_server_version.as_deref())),
    ])
}

fn health_detail(h: &Health) -> String {
    output::detail_block(&[
        ("Server", h.server.clone()),
        ("TLS", h.tls.clone()),
        ("API version", h.api_version.clone()),
        ("Connected", output::flag(Some(h.connected))),
        ("Healthy", output::flag(Some(h.health_ok))),
        ("Last poll", output::when(h.coordinator.last_success)),
        ("Token expiry", output::when(h.session.expires_at)),
        ("Refresh token", output::flag(Some(h.session.has_refresh_token))),
    ])
}

pub async fn handle(
    controller: &Controller,
    args: ServerArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let out = match args.command {
        ServerCommand::Info => {
            let snapshot = util::snapshot(controller).await?;
            let info = snapshot
                .server_info
                .as_ref()
                .ok_or_else(|| CliError::NotFound {
                    resource_type: "server info".into(),
                    identifier: controller.config().title(),
                    list_command: "diagnostics".into(),
                })?;
            output::render_single(&global.output, info, info_detail, |s| {
                s.build_version.clone().unwrap_or_default()
            })
        }
        ServerCommand::Capabilities => {
            let caps = controller.capabilities().await?;
            let rows: Vec<CapabilityRow> = CAPABILITIES
                .iter()
                .map(|(cap, commands)| CapabilityRow {
                    capability: cap.to_string(),
                    commands,
                    supported: caps.supports(*cap),
                })
                .collect();
            output::render_list(
                &global.output,
                &rows,
                CapabilityRow::clone,
                |r| r.capability.clone(),
            )
        }
        ServerCommand::Health => {
            let server_config = controller.config();
            let snapshot = util::snapshot(controller).await?;
            let health = Health {
                server: server_config.title(),
                tls: config::describe_tls(&server_config.tls),
                api_version: server_config.api_version.to_string(),
                connected: snapshot.diagnostics.connected,
                health_ok: snapshot.diagnostics.health_ok,
                coordinator: controller.status().await?,
                session: controller.token_info().await?,
            };
            output::render_single(&global.output, &health, health_detail, |h| {
                h.health_ok.to_string()
            })
        }
    };

    output::print_output(&out, global.quiet);
    Ok(())
}
