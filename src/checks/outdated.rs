//! Outdated dependency check backed by `npm outdated --json`.

use super::{capture_stdout, CheckOutcome};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Version pair npm reports for one outdated package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutdatedPackage {
    /// Installed version; absent when the package is declared but not
    /// installed.
    pub current: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wanted: Option<String>,
    pub latest: Option<String>,
}

pub type OutdatedData = BTreeMap<String, OutdatedPackage>;

pub async fn run(root: &Path, ci_mode: bool) -> CheckOutcome<OutdatedData> {
    if ci_mode {
        let mut data = OutdatedData::new();
        data.insert(
            "mock-package".to_string(),
            OutdatedPackage {
                current: Some("1.0.0".to_string()),
                wanted: None,
                latest: Some("2.0.0".to_string()),
            },
        );
        return CheckOutcome::ok(data);
    }

    match capture_stdout("npm", &["outdated", "--json"], root).await {
        Ok(stdout) => parse(&stdout),
        Err(e) => CheckOutcome::failed(e),
    }
}

fn parse(stdout: &str) -> CheckOutcome<OutdatedData> {
    if stdout.trim().is_empty() {
        return CheckOutcome::clean();
    }
    match serde_json::from_str::<OutdatedData>(stdout) {
        // Empty map means everything is up to date
        Ok(data) if data.is_empty() => CheckOutcome::clean(),
        Ok(data) => CheckOutcome::ok(data),
        Err(_) => CheckOutcome::failed("failed to parse npm outdated output"),
    }
}
