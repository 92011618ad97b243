//! Command-line surface: flag parsing and check orchestration.

use clap::{ArgAction, Parser};
use std::env;
use std::future::Future;
use std::path::PathBuf;

use crate::checks::{self, CheckOutcome};
use crate::config::{Config, ScanSettings};
use crate::output::{self, HealthResults, OutputMode};
use crate::progress;
use crate::report;
use crate::scan_events::ScanEvent;
use anyhow::{Context, Result};
use colored::*;
use tokio::sync::mpsc;

#[derive(Debug, Parser)]
#[command(name = "checkup")]
#[command(version)]
#[command(about = "Analyze a Node.js project and generate a health report")]
#[command(long_about = "Checkup runs a set of project health checks and writes JSON and \
    Markdown reports.\n\n\
    Examples:\n  \
    checkup                          # Run all checks on the current directory\n  \
    checkup --security --outdated    # Run selected checks only\n  \
    checkup --large-files --min-size 500KB\n  \
    checkup --ci                     # Canned data, no real checks")]
pub struct Cli {
    /// Run only the security audit
    #[arg(long)]
    pub security: bool,

    /// Check only for outdated dependencies
    #[arg(long)]
    pub outdated: bool,

    /// Check only for unused dependencies
    #[arg(long)]
    pub unused: bool,

    /// Check only for large files
    #[arg(long)]
    pub large_files: bool,

    /// Check only for test files
    #[arg(long)]
    pub tests: bool,

    /// Run all checks (default when no check flags are given)
    #[arg(long)]
    pub all: bool,

    /// Use canned synthetic data instead of real checks (fast, no I/O)
    #[arg(long)]
    pub ci: bool,

    /// Project root to analyze (default: current directory)
    #[arg(long, value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Minimum file size for --large-files (e.g. 500KB, 2MB)
    #[arg(long, value_name = "SIZE")]
    pub min_size: Option<String>,

    /// Wall-clock budget per file scan, in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Maximum number of concurrent file probes
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Exclude paths matching pattern (repeatable)
    #[arg(long, value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Output results as JSON for scripting
    #[arg(long)]
    pub json: bool,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

impl Cli {
    /// Run the requested checks. Returns true if any check found an issue.
    pub async fn run(self) -> Result<bool> {
        let mode = if self.quiet {
            OutputMode::Quiet
        } else if self.verbose > 0 {
            OutputMode::Verbose
        } else {
            OutputMode::Normal
        };

        let root = match self.path.clone() {
            Some(path) => path,
            None => env::current_dir().context("failed to resolve current directory")?,
        };

        // No selection flags means run everything
        let run_all = self.all
            || !(self.security || self.outdated || self.unused || self.large_files || self.tests);

        let config = Config::load(&root)?;
        let settings = ScanSettings::resolve(
            &config,
            self.min_size.as_deref(),
            self.timeout,
            self.concurrency,
            &self.exclude,
        )?;

        // Spinner fed by scan progress events, skipped for scripted output
        let (events_tx, mut events_rx) = mpsc::unbounded_channel::<ScanEvent>();
        let spinner = if mode == OutputMode::Quiet || self.json || self.ci {
            None
        } else {
            Some(progress::create_spinner("Running checks..."))
        };
        let spinner_task = spinner.clone().map(|sp| {
            tokio::spawn(async move {
                while let Some(ScanEvent::Progress { seen }) = events_rx.recv().await {
                    sp.set_message(format!("Scanned {seen} files..."));
                }
            })
        });

        let ci = self.ci;
        let results = {
            let outdated = run_if(run_all || self.outdated, checks::outdated::run(&root, ci));
            let audit = run_if(run_all || self.security, checks::audit::run(&root, ci));
            let unused = run_if(run_all || self.unused, checks::unused::run(&root, ci));
            let large_files = run_if(
                run_all || self.large_files,
                checks::large_files::run(&root, &settings, Some(events_tx.clone()), ci),
            );
            let test_files = run_if(
                run_all || self.tests,
                checks::test_files::run(&root, &settings, Some(events_tx.clone()), ci),
            );
            let (outdated, audit, unused, large_files, test_files) =
                tokio::join!(outdated, audit, unused, large_files, test_files);
            HealthResults {
                outdated,
                audit,
                unused,
                large_files,
                test_files,
            }
        };

        // Close the event channel so the spinner task drains and stops
        drop(events_tx);
        if let Some(task) = spinner_task {
            let _ = task.await;
        }
        if let Some(sp) = spinner {
            progress::finish_and_clear(&sp);
        }

        if self.json {
            output::print_json(&results)?;
        } else {
            output::print_human(&results, mode);
            if run_all {
                output::print_summary(&results, mode);
            }
        }

        // Synthetic mode skips all real I/O, reports included
        if run_all && !self.ci {
            let md_path = report::write(&root, &results)?;
            if mode != OutputMode::Quiet && !self.json {
                println!();
                println!("{}", format!("Report saved: {}", md_path.display()).green());
            }
        }

        Ok(results.has_issues())
    }
}

async fn run_if<T>(
    enabled: bool,
    check: impl Future<Output = CheckOutcome<T>>,
) -> Option<CheckOutcome<T>> {
    if enabled {
        Some(check.await)
    } else {
        None
    }
}
