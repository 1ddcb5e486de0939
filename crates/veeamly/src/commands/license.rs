//! License command handler.

use veeamly_core::{Controller, LicenseInfo};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

fn detail(l: &LicenseInfo) -> String {
    output::detail_block(&[
        ("Status", output::or_dash(l.status.as_deref())),
        ("Edition", output::or_dash(l.edition.as_deref())),
        ("Type", output::or_dash(l.license_type.as_deref())),
        ("Licensed to", output::or_dash(l.licensed_to.as_deref())),
        ("Expires", output::when(l.expiration_date)),
        ("Support expires", output::when(l.support_expiration_date)),
        ("Support ID", output::or_dash(l.support_id.as_deref())),
        ("Auto update", output::flag(l.auto_update_enabled)),
        ("Cloud Connect", output::or_dash(l.cloud_connect.as_deref())),
    ])
}

pub async fn handle(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = util::snapshot(controller).await?;
    let license = snapshot
        .license_info
        .as_ref()
        .ok_or_else(|| CliError::NotFound {
            resource_type: "license".into(),
            identifier: controller.config().title(),
            list_command: "diagnostics".into(),
        })?;

    let out = output::render_single(&global.output, license, detail, |l| {
        l.status.clone().unwrap_or_default()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
