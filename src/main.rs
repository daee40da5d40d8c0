/*!
 * reclaim - Force-delete stuck files and directories
 *
 * Exit status: 0 when every target was deleted (or, with --dry-run, every
 * target could be planned), 2 when some were only scheduled for removal
 * at next start, 1 otherwise.
 */

use clap::Parser;
use dialoguer::Confirm;
use force_reclaim::{
    init_tracing, render_json, render_plan_json, render_plan_text, render_summary, render_text,
    Outcome, ReclaimConfig, ReclaimService, SessionReport,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Force-delete files and directories that resist removal
#[derive(Parser, Debug)]
#[command(name = "reclaim", version, about)]
struct Cli {
    /// Files or directories to reclaim
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,

    /// Print reports as JSON
    #[arg(long)]
    json: bool,

    /// Permit filesystem roots and system directories as targets
    #[arg(long)]
    allow_protected: bool,

    /// Do not schedule removal at next start when every strategy fails
    #[arg(long)]
    no_defer: bool,

    /// Show size, lock holders and strategy order without changing anything
    #[arg(short = 'n', long, conflicts_with = "yes")]
    dry_run: bool,
}

impl Cli {
    fn apply(&self, config: &mut ReclaimConfig) {
        config.allow_protected |= self.allow_protected;
        if self.no_defer {
            config.defer_on_failure = false;
        }
    }
}

/// Ask on the terminal; declines when there is no terminal to ask on
fn confirm(paths: &[PathBuf]) -> bool {
    eprintln!("The following will be removed permanently, killing processes that hold them:");
    for path in paths {
        eprintln!("  {}", path.display());
    }

    match Confirm::new()
        .with_prompt("Continue?")
        .default(false)
        .wait_for_newline(true)
        .interact()
    {
        Ok(answer) => answer,
        Err(e) => {
            warn!(error = %e, "confirmation prompt unavailable; declining");
            false
        }
    }
}

fn exit_code(reports: &[SessionReport], errors: usize) -> ExitCode {
    if errors > 0 || reports.iter().any(|r| r.outcome == Outcome::Failed) {
        ExitCode::from(1)
    } else if reports.iter().any(|r| r.needs_restart()) {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}

async fn dry_run(service: &ReclaimService, cli: &Cli) -> ExitCode {
    let mut errors = 0;
    for (path, result) in service.plan_all(&cli.paths).await {
        match result {
            Ok(plan) if cli.json => match render_plan_json(&plan) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("cannot encode plan for {}: {}", path.display(), e),
            },
            Ok(plan) => println!("{}", render_plan_text(&plan)),
            Err(e) => {
                errors += 1;
                eprintln!("{}: {:?}", path.display(), miette::Report::new(e));
            }
        }
    }
    if errors > 0 {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let mut config = match ReclaimConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:?}", miette::Report::new(e));
            return ExitCode::from(1);
        }
    };
    cli.apply(&mut config);
    let service = ReclaimService::host(config);

    if cli.dry_run {
        return dry_run(&service, &cli).await;
    }

    let confirmed = cli.yes || confirm(&cli.paths);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; stopping after the current strategy");
            on_interrupt.cancel();
        }
    });

    info!(targets = cli.paths.len(), "reclaim starting");
    let results = service.reclaim_all(&cli.paths, confirmed, cancel).await;

    let mut reports = Vec::new();
    let mut errors = 0;
    for (path, result) in results {
        match result {
            Ok(report) => {
                if cli.json {
                    match render_json(&report) {
                        Ok(json) => println!("{}", json),
                        Err(e) => eprintln!("cannot encode report for {}: {}", path.display(), e),
                    }
                } else {
                    println!("{}", render_text(&report));
                }
                reports.push(report);
            }
            Err(e) => {
                errors += 1;
                eprintln!("{}: {:?}", path.display(), miette::Report::new(e));
            }
        }
    }

    if !cli.json && cli.paths.len() > 1 {
        let mut summary = render_summary(&reports);
        if errors > 0 {
            summary.push_str(&format!(", {} rejected", errors));
        }
        println!("{}", summary);
    }

    exit_code(&reports, errors)
}
