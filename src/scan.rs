//! Bounded-concurrency filesystem scan engine with cancellation.
//!
//! One generic pipeline serves every file-based check: a lazy producer
//! enumerates candidate paths, a bounded worker pool runs an async probe per
//! entry, accepted outcomes land in an accumulator, and a wall-clock deadline
//! supervises the whole call. Admission is event-driven through a semaphore,
//! so the pool never spins waiting for capacity.

use crate::scan_events::ScanEvent;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::fmt;
use std::future::Future;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::Semaphore;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Default cap on concurrently in-flight probes.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Default wall-clock budget for one scan call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default progress notification interval, in entries seen.
pub const DEFAULT_PROGRESS_EVERY: u64 = 1000;

/// Parameters for one scan call. Owned by that call and never shared, so
/// concurrent scans cannot interfere with each other.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Directory to enumerate. A missing or unreadable root yields an
    /// empty scan, not an error.
    pub root: PathBuf,
    /// Glob pattern matched against root-relative paths.
    pub pattern: String,
    /// Glob patterns whose matches (and matching subtrees) are skipped.
    pub excludes: Vec<String>,
    /// Cap on concurrently in-flight probes.
    pub concurrency: usize,
    /// Wall-clock budget for the whole call.
    pub timeout: Duration,
    /// Emit a progress event every N entries seen.
    pub progress_every: u64,
    /// Optional sink for progress events.
    pub events: Option<UnboundedSender<ScanEvent>>,
}

impl ScanOptions {
    pub fn new(root: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            pattern: pattern.into(),
            excludes: Vec::new(),
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            progress_every: DEFAULT_PROGRESS_EVERY,
            events: None,
        }
    }
}

/// A probe outcome retained by the accept predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit<T> {
    /// Path relative to the scan root.
    pub path: PathBuf,
    pub payload: T,
}

/// Result of a scan that ran to natural completion.
#[derive(Debug)]
pub struct ScanSummary<T> {
    /// Accepted outcomes, in completion order.
    pub hits: Vec<Hit<T>>,
    /// Candidate entries enumerated under the root (excluded paths are
    /// never counted).
    pub total_seen: u64,
    /// Entries whose probe failed silently (vanished, unreadable).
    pub skipped: u64,
    pub elapsed: Duration,
}

/// The deadline elapsed before the scan finished. Carries everything that
/// completed before expiry so callers can still inspect partial findings.
#[derive(Debug, Error)]
#[error("timeout after {}s, scanned {} files", .timeout.as_secs(), .total_seen)]
pub struct ScanTimeout<T: fmt::Debug> {
    pub hits: Vec<Hit<T>>,
    pub total_seen: u64,
    pub skipped: u64,
    pub timeout: Duration,
}

/// Walk `opts.root`, probe every entry matching `opts.pattern` under the
/// concurrency cap, and collect outcomes that pass `accept`.
///
/// Resolves exactly once: either with a [`ScanSummary`] when the tree is
/// exhausted and all probes have drained, or with a [`ScanTimeout`] carrying
/// partial results when the deadline fires first. After a timeout, probes
/// already in flight may still finish in the background; their results are
/// dropped.
pub async fn scan<T, P, Fut, A>(
    opts: ScanOptions,
    probe: P,
    accept: A,
) -> Result<ScanSummary<T>, ScanTimeout<T>>
where
    T: fmt::Debug + Send + 'static,
    P: Fn(PathBuf) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<T>> + Send + 'static,
    A: Fn(&T) -> bool + Send + Sync + 'static,
{
    let concurrency = opts.concurrency.max(1);
    let started = Instant::now();
    let cancel = CancellationToken::new();
    let seen = Arc::new(AtomicU64::new(0));
    let skipped = Arc::new(AtomicU64::new(0));
    let hits: Arc<Mutex<Vec<Hit<T>>>> = Arc::new(Mutex::new(Vec::new()));
    let probe = Arc::new(probe);
    let accept = Arc::new(accept);
    let limiter = Arc::new(Semaphore::new(concurrency));

    // Bounded queue between enumeration and probing: the producer parks on a
    // full pipeline instead of materializing the whole tree in memory.
    let (path_tx, mut path_rx) = mpsc::channel::<(PathBuf, PathBuf)>(concurrency * 2);

    let producer = spawn_producer(&opts, cancel.clone(), Arc::clone(&seen), path_tx);

    let drive = {
        let cancel = cancel.clone();
        let hits = Arc::clone(&hits);
        let skipped = Arc::clone(&skipped);
        let limiter = Arc::clone(&limiter);
        async move {
            while let Some((abs, rel)) = path_rx.recv().await {
                // Admission: one permit per in-flight probe, released when
                // the probe task finishes.
                let permit = Arc::clone(&limiter)
                    .acquire_owned()
                    .await
                    .expect("semaphore closed");
                let probe = Arc::clone(&probe);
                let accept = Arc::clone(&accept);
                let hits = Arc::clone(&hits);
                let skipped = Arc::clone(&skipped);
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    match probe(abs).await {
                        Some(payload) => {
                            if accept(&payload) && !cancel.is_cancelled() {
                                hits.lock().expect("accumulator poisoned").push(Hit {
                                    path: rel,
                                    payload,
                                });
                            }
                        }
                        None => {
                            skipped.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                });
            }
            // Queue drained and producer gone; wait for in-flight probes.
            let _ = limiter.acquire_many(concurrency as u32).await;
        }
    };

    tokio::select! {
        _ = drive => {
            let _ = producer.await;
            let hits = mem::take(&mut *hits.lock().expect("accumulator poisoned"));
            let summary = ScanSummary {
                hits,
                total_seen: seen.load(Ordering::Relaxed),
                skipped: skipped.load(Ordering::Relaxed),
                elapsed: started.elapsed(),
            };
            debug!(
                total_seen = summary.total_seen,
                hits = summary.hits.len(),
                elapsed_ms = summary.elapsed.as_millis() as u64,
                "scan complete"
            );
            Ok(summary)
        }
        _ = tokio::time::sleep(opts.timeout) => {
            cancel.cancel();
            let hits = mem::take(&mut *hits.lock().expect("accumulator poisoned"));
            let total_seen = seen.load(Ordering::Relaxed);
            warn!(total_seen, hits = hits.len(), "scan deadline elapsed, returning partial results");
            Err(ScanTimeout {
                hits,
                total_seen,
                skipped: skipped.load(Ordering::Relaxed),
                timeout: opts.timeout,
            })
        }
    }
}

/// Enumerate candidate files on a blocking task, feeding the bounded path
/// queue. The walk is lazy: a full queue blocks the walk until the pool
/// frees up, and cancellation stops it between entries.
fn spawn_producer(
    opts: &ScanOptions,
    cancel: CancellationToken,
    seen: Arc<AtomicU64>,
    tx: mpsc::Sender<(PathBuf, PathBuf)>,
) -> task::JoinHandle<()> {
    let root = opts.root.clone();
    let pattern = opts.pattern.clone();
    let excludes = opts.excludes.clone();
    let progress_every = opts.progress_every.max(1);
    let events = opts.events.clone();

    task::spawn_blocking(move || {
        let matcher = match GlobBuilder::new(&pattern).literal_separator(true).build() {
            Ok(glob) => glob.compile_matcher(),
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "invalid scan pattern, treating as no matches");
                return;
            }
        };
        let exclude_set = build_exclude_set(&excludes);

        let walker = WalkDir::new(&root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                let rel = relative(entry.path(), &root);
                !(entry.file_type().is_dir() && exclude_set.is_match(rel))
            });

        for entry in walker {
            if cancel.is_cancelled() {
                break;
            }
            let entry = match entry {
                // Unreadable roots and vanished entries thin the enumeration
                // without failing the scan.
                Ok(e) => e,
                Err(_) => continue,
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = relative(entry.path(), &root).to_path_buf();
            if exclude_set.is_match(&rel) {
                continue;
            }
            let count = seen.fetch_add(1, Ordering::Relaxed) + 1;
            if count % progress_every == 0 {
                debug!(seen = count, "scan progress");
                if let Some(ref events) = events {
                    let _ = events.send(ScanEvent::Progress { seen: count });
                }
            }
            if !matcher.is_match(&rel) {
                continue;
            }
            if tx.blocking_send((entry.into_path(), rel)).is_err() {
                // Receiver gone: the scan was closed under us.
                break;
            }
        }
    })
}

fn relative<'a>(path: &'a Path, root: &Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}

/// Exclude patterns prune whole subtrees: `node_modules/**` also has to
/// match the `node_modules` directory itself.
fn build_exclude_set(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let trimmed = pattern.trim_end_matches("/**");
        for candidate in [pattern.as_str(), trimmed] {
            match GlobBuilder::new(candidate).literal_separator(true).build() {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => {
                    warn!(pattern = %candidate, error = %e, "ignoring invalid exclude pattern");
                }
            }
            if trimmed == pattern {
                break;
            }
        }
    }
    builder.build().unwrap_or_else(|e| {
        warn!(error = %e, "failed to compile exclude set, excluding nothing");
        GlobSet::empty()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    fn write_file(root: &Path, name: &str, bytes: usize) {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, vec![b'x'; bytes]).unwrap();
    }

    fn size_probe(path: PathBuf) -> impl Future<Output = Option<u64>> + Send {
        async move { tokio::fs::metadata(&path).await.ok().map(|meta| meta.len()) }
    }

    #[tokio::test]
    async fn size_threshold_scan_reports_only_large_files() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.txt", 2048);
        write_file(dir.path(), "b.txt", 512);

        let opts = ScanOptions::new(dir.path(), "**/*.*");
        let summary = scan(opts, size_probe, |size: &u64| *size > 1024)
            .await
            .unwrap();

        assert_eq!(summary.total_seen, 2);
        assert_eq!(summary.hits.len(), 1);
        assert_eq!(summary.hits[0].path, PathBuf::from("a.txt"));
        assert_eq!(summary.hits[0].payload, 2048);
    }

    #[tokio::test]
    async fn pattern_scan_counts_all_candidates() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "x.test.js", 10);
        write_file(dir.path(), "y.spec.js", 10);
        write_file(dir.path(), "z.js", 10);

        let opts = ScanOptions::new(dir.path(), "**/*.{test,spec}.js");
        let summary = scan(opts, |_path: PathBuf| async move { Some(()) }, |_: &()| true)
            .await
            .unwrap();

        assert_eq!(summary.total_seen, 3);
        let paths: BTreeSet<_> = summary.hits.iter().map(|hit| hit.path.clone()).collect();
        assert_eq!(paths.len(), 2);
        assert!(paths.contains(Path::new("x.test.js")));
        assert!(paths.contains(Path::new("y.spec.js")));
    }

    #[tokio::test]
    async fn respects_concurrency_cap() {
        let dir = TempDir::new().unwrap();
        for i in 0..40 {
            write_file(dir.path(), &format!("file-{i}.txt"), 16);
        }

        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let probe_active = Arc::clone(&active);
        let probe_peak = Arc::clone(&peak);

        let mut opts = ScanOptions::new(dir.path(), "**/*.*");
        opts.concurrency = 4;
        let summary = scan(
            opts,
            move |_path: PathBuf| {
                let active = Arc::clone(&probe_active);
                let peak = Arc::clone(&probe_peak);
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Some(())
                }
            },
            |_: &()| true,
        )
        .await
        .unwrap();

        assert_eq!(summary.total_seen, 40);
        let peak = peak.load(Ordering::SeqCst);
        assert!(peak <= 4, "peak concurrency {peak} exceeded cap");
    }

    #[tokio::test]
    async fn deadline_returns_partial_results() {
        let dir = TempDir::new().unwrap();
        for i in 0..20 {
            write_file(dir.path(), &format!("slow-{i}.txt"), 16);
        }

        let mut opts = ScanOptions::new(dir.path(), "**/*.*");
        opts.concurrency = 2;
        opts.timeout = Duration::from_millis(50);
        let err = scan(
            opts,
            |_path: PathBuf| async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Some(())
            },
            |_: &()| true,
        )
        .await
        .unwrap_err();

        assert!(err.total_seen <= 20);
        assert!(err.hits.is_empty());
        assert!(err.to_string().contains("timeout after 0s"));
    }

    #[tokio::test]
    async fn missing_root_is_an_empty_scan() {
        let dir = TempDir::new().unwrap();
        let opts = ScanOptions::new(dir.path().join("does-not-exist"), "**/*.*");
        let summary = scan(opts, size_probe, |_: &u64| true).await.unwrap();

        assert_eq!(summary.total_seen, 0);
        assert!(summary.hits.is_empty());
    }

    #[tokio::test]
    async fn excluded_subtrees_are_pruned() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "keep.txt", 10);
        write_file(dir.path(), "node_modules/dep/big.txt", 10);
        write_file(dir.path(), "logs/trace.log", 10);

        let mut opts = ScanOptions::new(dir.path(), "**/*.*");
        opts.excludes = vec!["node_modules/**".to_string(), "**/*.log".to_string()];
        let summary = scan(opts, |_path: PathBuf| async move { Some(()) }, |_: &()| true)
            .await
            .unwrap();

        assert_eq!(summary.total_seen, 1);
        assert_eq!(summary.hits.len(), 1);
        assert_eq!(summary.hits[0].path, PathBuf::from("keep.txt"));
    }

    #[tokio::test]
    async fn repeated_scans_agree() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "one.txt", 2048);
        write_file(dir.path(), "sub/two.txt", 4096);
        write_file(dir.path(), "sub/small.txt", 100);

        let run = || async {
            let mut opts = ScanOptions::new(dir.path(), "**/*.*");
            opts.concurrency = 3;
            scan(opts, size_probe, |size: &u64| *size > 1024)
                .await
                .unwrap()
        };
        let first = run().await;
        let second = run().await;

        let as_set = |summary: &ScanSummary<u64>| {
            summary
                .hits
                .iter()
                .map(|hit| (hit.path.clone(), hit.payload))
                .collect::<BTreeSet<_>>()
        };
        assert_eq!(as_set(&first), as_set(&second));
        assert_eq!(first.total_seen, second.total_seen);
    }

    #[tokio::test]
    async fn progress_events_fire_on_boundaries() {
        let dir = TempDir::new().unwrap();
        for i in 0..25 {
            write_file(dir.path(), &format!("f{i}.txt"), 8);
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut opts = ScanOptions::new(dir.path(), "**/*.*");
        opts.progress_every = 10;
        opts.events = Some(tx);
        scan(opts, |_path: PathBuf| async move { Some(()) }, |_: &()| true)
            .await
            .unwrap();

        let mut boundaries = Vec::new();
        while let Ok(ScanEvent::Progress { seen }) = rx.try_recv() {
            boundaries.push(seen);
        }
        assert_eq!(boundaries, vec![10, 20]);
    }

    #[tokio::test]
    async fn failed_probes_count_as_skipped() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "gone.txt", 8);
        write_file(dir.path(), "here.txt", 8);

        let summary = scan(
            ScanOptions::new(dir.path(), "**/*.*"),
            |path: PathBuf| async move {
                if path.ends_with("gone.txt") {
                    None
                } else {
                    Some(())
                }
            },
            |_: &()| true,
        )
        .await
        .unwrap();

        assert_eq!(summary.total_seen, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.hits.len(), 1);
        assert_eq!(summary.hits[0].path, PathBuf::from("here.txt"));
    }
}
