//! Project-local configuration loaded from an optional `checkup.toml`.

use crate::scan;
use anyhow::{Context, Result};
use bytesize::ByteSize;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Config file looked up in the project root.
pub const CONFIG_FILE: &str = "checkup.toml";

/// Subtrees that are never scanned. Matches the ignore conventions of the
/// JavaScript projects this tool targets.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "node_modules/**",
    "reports/**",
    ".git/**",
    "dist/**",
    "build/**",
    "coverage/**",
];

/// Default threshold above which a file counts as large.
pub const DEFAULT_MIN_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanSection,
}

/// `[scan]` section of checkup.toml.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanSection {
    /// Extra exclude patterns, appended to the defaults.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Large-file threshold, e.g. "500KB" or "2MB".
    pub min_size: Option<String>,
    /// Wall-clock budget per file scan, in seconds.
    pub timeout_secs: Option<u64>,
    /// Cap on concurrently in-flight file probes.
    pub concurrency: Option<usize>,
}

impl Config {
    /// Load the config file from the project root, or defaults if absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
    }
}

/// Scan knobs after merging defaults, the config file, and CLI flags.
/// CLI flags win over the config file; the config file wins over defaults.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub excludes: Vec<String>,
    pub min_size_bytes: u64,
    pub timeout: Duration,
    pub concurrency: usize,
}

impl ScanSettings {
    pub fn resolve(
        config: &Config,
        min_size: Option<&str>,
        timeout_secs: Option<u64>,
        concurrency: Option<usize>,
        extra_excludes: &[String],
    ) -> Result<Self> {
        let mut excludes: Vec<String> = DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect();
        excludes.extend(config.scan.exclude.iter().cloned());
        excludes.extend(extra_excludes.iter().cloned());

        let min_size_bytes = match min_size.or(config.scan.min_size.as_deref()) {
            Some(raw) => raw
                .parse::<ByteSize>()
                .map_err(|e| anyhow::anyhow!("invalid size '{raw}': {e}"))?
                .as_u64(),
            None => DEFAULT_MIN_SIZE,
        };

        let timeout = Duration::from_secs(
            timeout_secs
                .or(config.scan.timeout_secs)
                .unwrap_or(scan::DEFAULT_TIMEOUT.as_secs()),
        );
        let concurrency = concurrency
            .or(config.scan.concurrency)
            .unwrap_or(scan::DEFAULT_CONCURRENCY);

        Ok(Self {
            excludes,
            min_size_bytes,
            timeout,
            concurrency,
        })
    }
}
