//! Large file check built on the scan engine.

use super::CheckOutcome;
use crate::config::ScanSettings;
use crate::scan::{self, Hit, ScanOptions};
use crate::scan_events::ScanEvent;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;

/// Everything with an extension: the check covers all file types.
const PATTERN: &str = "**/*.*";

#[derive(Debug, Clone, Serialize)]
pub struct LargeFile {
    pub path: PathBuf,
    pub size_bytes: u64,
}

impl LargeFile {
    /// Size in megabytes with two decimals, the format used in reports.
    pub fn size_mb(&self) -> String {
        format!("{:.2}", self.size_bytes as f64 / (1024.0 * 1024.0))
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LargeFilesData {
    pub files: Vec<LargeFile>,
    pub total_scanned: u64,
    /// Entries that vanished or were unreadable between enumeration and stat.
    pub skipped: u64,
}

pub async fn run(
    root: &Path,
    settings: &ScanSettings,
    events: Option<UnboundedSender<ScanEvent>>,
    ci_mode: bool,
) -> CheckOutcome<LargeFilesData> {
    if ci_mode {
        return CheckOutcome::ok(LargeFilesData {
            files: vec![LargeFile {
                path: PathBuf::from("mock-large-file.zip"),
                size_bytes: 5 * 1024 * 1024,
            }],
            total_scanned: 1,
            skipped: 0,
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
    let min_size = settings.min_size_bytes;

    let result = scan::scan(
        opts,
        |path: PathBuf| async move { tokio::fs::metadata(&path).await.ok().map(|meta| meta.len()) },
        move |size: &u64| *size > min_size,
    )
    .await;

    match result {
        Ok(summary) => CheckOutcome::ok(collect(summary.hits, summary.total_seen, summary.skipped)),
        // A timed out scan still carries everything found before the
        // deadline; callers get the partial data plus the error marker.
        Err(timeout) => {
            let message = timeout.to_string();
            CheckOutcome::partial(
                collect(timeout.hits, timeout.total_seen, timeout.skipped),
                message,
            )
        }
    }
}

fn collect(hits: Vec<Hit<u64>>, total_scanned: u64, skipped: u64) -> LargeFilesData {
    let files = hits
        .into_iter()
        .map(|hit| LargeFile {
            path: hit.path,
            size_bytes: hit.payload,
        })
        .collect();
    LargeFilesData {
        files,
        total_scanned,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn settings(min_size_bytes: u64) -> ScanSettings {
        ScanSettings {
            excludes: vec!["node_modules/**".to_string()],
            min_size_bytes,
            timeout: Duration::from_secs(60),
            concurrency: 4,
        }
    }

    #[tokio::test]
    async fn finds_files_over_the_threshold() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("big.bin"), vec![0u8; 4096]).unwrap();
        fs::write(dir.path().join("small.bin"), vec![0u8; 64]).unwrap();
        fs::create_dir_all(dir.path().join("node_modules")).unwrap();
        fs::write(dir.path().join("node_modules/huge.bin"), vec![0u8; 8192]).unwrap();

        let outcome = run(dir.path(), &settings(1024), None, false).await;
        let data = outcome.data.unwrap();

        assert_eq!(data.total_scanned, 2);
        assert_eq!(data.files.len(), 1);
        assert_eq!(data.files[0].path, PathBuf::from("big.bin"));
        assert_eq!(data.files[0].size_bytes, 4096);
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn ci_mode_returns_canned_data() {
        let outcome = run(Path::new("/nonexistent"), &settings(1024), None, true).await;
        let data = outcome.data.unwrap();
        assert_eq!(data.files[0].path, PathBuf::from("mock-large-file.zip"));
        assert_eq!(data.files[0].size_mb(), "5.00");
    }

    #[test]
    fn size_mb_formats_two_decimals() {
        let file = LargeFile {
            path: PathBuf::from("x"),
            size_bytes: 1024 * 1024 + 512 * 1024,
        };
        assert_eq!(file.size_mb(), "1.50");
    }
}
