//! Job command handlers.

use tabled::Tabled;
use veeamly_core::{Action, Controller, Job};

use crate::cli::{GlobalOpts, JobsArgs, JobsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct JobRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    job_type: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Last Run")]
    last_run: String,
    #[tabled(rename = "Next Run")]
    next_run: String,
}

fn row(job: &Job, color: bool) -> JobRow {
    JobRow {
        id: job.id.clone(),
        name: job.name.clone(),
        job_type: job.job_type.clone(),
        status: output::paint_status(job.display_status(), color),
        last_run: output::when(job.last_run),
        next_run: output::when(job.next_run),
    }
}

fn detail(job: &Job) -> String {
    let mut pairs = vec![
        ("ID", job.id.clone()),
        ("Name", job.name.clone()),
        ("Type", job.job_type.clone()),
        ("Status", job.display_status().to_owned()),
        ("State", job.status.clone()),
        ("Last result", job.last_result.clone()),
        ("Last run", output::when(job.last_run)),
        ("Next run", output::when(job.next_run)),
    ];
    if let Some(progress) = job.extra.get("progressPercent").and_then(|v| v.as_f64()) {
        pairs.push(("Progress", format!("{progress:.0}%")));
    }
    if let Some(workload) = job.extra.get("workload").and_then(|v| v.as_str()) {
        pairs.push(("Workload", workload.to_owned()));
    }
    output::detail_block(&pairs)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: JobsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let snapshot = util::snapshot(controller).await?;

    let (action, confirm) = match args.command {
        JobsCommand::List { status } => {
            let jobs: Vec<Job> = snapshot
                .jobs
                .iter()
                .filter(|j| {
                    status
                        .as_deref()
                        .is_none_or(|s| j.display_status().eq_ignore_ascii_case(s))
                })
                .cloned()
                .collect();
            let color = output::should_color(&global.color);
            let out = output::render_list(
                &global.output,
                &jobs,
                |j| row(j, color),
                |j| j.id.clone(),
            );
            output::print_output(&out, global.quiet);
            return Ok(());
        }
        JobsCommand::Get { job } => {
            let job = util::resolve_job(&snapshot, &job)?;
            let out = output::render_single(&global.output, job, detail, |j| j.id.clone());
            output::print_output(&out, global.quiet);
            return Ok(());
        }
        JobsCommand::Start { job, full } => {
            let job = util::resolve_job(&snapshot, &job)?;
            (
                Action::StartJob {
                    id: job.id.clone(),
                    active_full: full,
                },
                full.then(|| format!("Run an active full of '{}'?", job.name)),
            )
        }
        JobsCommand::Stop { job, graceful } => {
            let job = util::resolve_job(&snapshot, &job)?;
            (
                Action::StopJob {
                    id: job.id.clone(),
                    graceful,
                },
                Some(format!("Stop job '{}'?", job.name)),
            )
        }
        JobsCommand::Retry { job } => {
            let job = util::resolve_job(&snapshot, &job)?;
            (Action::RetryJob { id: job.id.clone() }, None)
        }
        JobsCommand::Enable { job } => {
            let job = util::resolve_job(&snapshot, &job)?;
            (Action::EnableJob { id: job.id.clone() }, None)
        }
        JobsCommand::Disable { job } => {
            let job = util::resolve_job(&snapshot, &job)?;
            (
                Action::DisableJob { id: job.id.clone() },
                Some(format!("Disable the schedule of '{}'?", job.name)),
            )
        }
    };

    super::run_action(controller, action, confirm.as_deref(), global).await
}
