//! `veeamly watch`: background polling with a persistent entity registry.
//!
//! Runs the coordinator on its interval, lets the reconciler keep the
//! registry file in step with each snapshot and prints one line per
//! update until interrupted.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use veeamly_core::{Controller, EntityRegistry, FileRegistry, ServerConfig, Snapshot};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

/// One line of watch output.
#[derive(Debug, Serialize)]
struct Tick {
    at: DateTime<Utc>,
    jobs: usize,
    running: usize,
    failed: usize,
    repositories: usize,
    extents: usize,
    entities: usize,
}

impl Tick {
    fn new(snapshot: &Snapshot, entities: usize) -> Self {
        Self {
            at: snapshot.diagnostics.last_successful_poll.unwrap_or_else(Utc::now),
            jobs: snapshot.jobs.len(),
            running: snapshot.jobs.iter().filter(|j| j.is_running()).count(),
            failed: snapshot
                .jobs
                .iter()
                .filter(|j| j.display_status() == "failed")
                .count(),
            repositories: snapshot.repositories.len(),
            extents: snapshot.sobrs.iter().map(|s| s.extents.len()).sum(),
            entities,
        }
    }

    fn render(&self, format: &OutputFormat) -> String {
        match format {
            OutputFormat::Json | OutputFormat::JsonCompact => output::render_json(self, true),
            _ => format!(
                "{}  jobs {} ({} running, {} failed)  repositories {}  extents {}  entities {}",
                self.at.format("%H:%M:%S"),
                self.jobs,
                self.running,
                self.failed,
                self.repositories,
                self.extents,
                self.entities,
            ),
        }
    }
}

async fn entity_count(controller: &Controller) -> usize {
    controller
        .registry()
        .entries(controller.entry_id())
        .await
        .map_or(0, |e| e.len())
}

pub async fn handle(
    profile_name: &str,
    mut server: ServerConfig,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if let Some(secs) = args.interval {
        if secs == 0 {
            return Err(CliError::Validation {
                field: "interval".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        server.poll_interval = Duration::from_secs(secs);
    }

    let path = args
        .registry
        .unwrap_or_else(|| config::registry_path(profile_name));
    let registry: Arc<dyn EntityRegistry> = Arc::new(FileRegistry::open(&path).await?);
    let entry_id = args.entry_id.unwrap_or_else(|| profile_name.to_owned());

    let spinner = crate::spinner(&format!("Connecting to {}", server.title()), global);
    let interval = server.poll_interval;
    let controller = Controller::setup(server, entry_id, registry).await;
    spinner.finish_and_clear();
    let controller = controller?;

    info!(registry = %path.display(), interval_secs = interval.as_secs(), "watching");
    if !global.quiet {
        eprintln!(
            "Watching {} every {}s, registry {} (Ctrl-C to stop)",
            controller.config().title(),
            interval.as_secs(),
            path.display()
        );
    }

    let mut stream = controller.subscribe().await?;
    if let Some(snapshot) = stream.latest() {
        let tick = Tick::new(&snapshot, entity_count(&controller).await);
        output::print_output(&tick.render(&global.output), global.quiet);
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            snapshot = stream.changed() => {
                let Some(snapshot) = snapshot else { break };
                let tick = Tick::new(&snapshot, entity_count(&controller).await);
                output::print_output(&tick.render(&global.output), global.quiet);
            }
        }
    }

    controller.shutdown().await;
    Ok(())
}
