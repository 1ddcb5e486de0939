mod cli;
mod commands;
mod config;
mod error;
mod output;

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use veeamly_core::{Controller, MemoryRegistry, ServerConfig};

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a server connection
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "veeamly", &mut std::io::stdout());
            Ok(())
        }

        Command::Watch(args) => {
            let (profile_name, server) = config::resolve_server_config(&cli.global)?;
            commands::watch::handle(&profile_name, server, args, &cli.global)
                .await
                .map_err(|e| e.with_profile(&profile_name))
        }

        cmd => {
            let (profile_name, server) = config::resolve_server_config(&cli.global)?;
            let controller = connect(&profile_name, server, &cli.global)
                .await
                .map_err(|e| CliError::from(e).with_profile(&profile_name))?;

            tracing::debug!(command = ?cmd, "dispatching command");
            let result = commands::dispatch(cmd, &controller, &cli.global).await;
            controller.shutdown().await;
            result.map_err(|e| e.with_profile(&profile_name))
        }
    }
}

/// One poll cycle against an in-memory registry; no background polling.
async fn connect(
    profile_name: &str,
    mut server: ServerConfig,
    global: &GlobalOpts,
) -> Result<Controller, veeamly_core::CoreError> {
    server.poll_interval = Duration::ZERO;
    let spinner = spinner(&format!("Connecting to {}", server.title()), global);
    let result = Controller::setup(server, profile_name, Arc::new(MemoryRegistry::new())).await;
    spinner.finish_and_clear();
    result
}

/// A stderr spinner, hidden when stderr is not a terminal or in quiet mode.
pub fn spinner(message: &str, global: &GlobalOpts) -> ProgressBar {
    if global.quiet || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.to_owned());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
