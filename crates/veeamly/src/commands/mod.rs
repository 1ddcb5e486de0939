//! Command dispatch: bridges CLI args -> controller -> output formatting.

pub mod config_cmd;
pub mod diagnostics;
pub mod entities;
pub mod jobs;
pub mod license;
pub mod repos;
pub mod server;
pub mod sobrs;
pub mod util;
pub mod watch;

use veeamly_core::{Action, Controller};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a server-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    controller: &Controller,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Jobs(args) => jobs::handle(controller, args, global).await,
        Command::Repos(args) => repos::handle(controller, args, global).await,
        Command::Sobrs(args) => sobrs::handle(controller, args, global).await,
        Command::Server(args) => server::handle(controller, args, global).await,
        Command::License => license::handle(controller, global).await,
        Command::Entities(args) => entities::handle(controller, args, global).await,
        Command::Diagnostics => diagnostics::handle(controller, global).await,
        // Handled before a connection is made
        Command::Watch(_) | Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}

/// Confirm if asked to, execute, and report.
pub async fn run_action(
    controller: &Controller,
    action: Action,
    confirm: Option<&str>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if confirm.map(|p| util::confirm(p, global.yes)).transpose()? == Some(false) {
        eprintln!("Aborted.");
        return Ok(());
    }

    let label = action.to_string();
    controller.execute(action).await?;
    if !global.quiet {
        eprintln!("✓ {label} accepted");
    }
    Ok(())
}
