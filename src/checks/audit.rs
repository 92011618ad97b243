//! Security audit check backed by `npm audit --json`.

use super::{capture_stdout, CheckOutcome};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditData {
    #[serde(default)]
    pub metadata: AuditMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditMetadata {
    /// Vulnerability counts by severity, as reported by npm.
    #[serde(default)]
    pub vulnerabilities: BTreeMap<String, u64>,
}

impl AuditData {
    /// Total findings across severities. npm v8+ adds an aggregate `total`
    /// key to the severity map; it is not a severity.
    pub fn vulnerability_count(&self) -> u64 {
        self.metadata
            .vulnerabilities
            .iter()
            .filter(|(severity, _)| severity.as_str() != "total")
            .map(|(_, count)| count)
            .sum()
    }
}

pub async fn run(root: &Path, ci_mode: bool) -> CheckOutcome<AuditData> {
    if ci_mode {
        let mut vulnerabilities = BTreeMap::new();
        vulnerabilities.insert("high".to_string(), 1);
        vulnerabilities.insert("moderate".to_string(), 2);
        vulnerabilities.insert("low".to_string(), 0);
        return CheckOutcome::ok(AuditData {
            metadata: AuditMetadata { vulnerabilities },
        });
    }

    match capture_stdout("npm", &["audit", "--json"], root).await {
        Ok(stdout) => parse(&stdout),
        Err(e) => CheckOutcome::failed(e),
    }
}

fn parse(stdout: &str) -> CheckOutcome<AuditData> {
    if stdout.trim().is_empty() {
        return CheckOutcome::clean();
    }
    match serde_json::from_str::<AuditData>(stdout) {
        Ok(data) => CheckOutcome::ok(data),
        Err(_) => CheckOutcome::failed("failed to parse npm audit output"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_npm_audit_metadata() {
        let raw = r#"{
            "auditReportVersion": 2,
            "vulnerabilities": {},
            "metadata": {
                "vulnerabilities": {
                    "info": 0,
                    "low": 1,
                    "moderate": 0,
                    "high": 2,
                    "critical": 0,
                    "total": 3
                }
            }
        }"#;
        let outcome = parse(raw);
        let data = outcome.data.unwrap();
        // The aggregate "total" key must not be double counted
        assert_eq!(data.vulnerability_count(), 3);
    }

    #[test]
    fn missing_metadata_counts_as_zero() {
        let outcome = parse(r#"{"auditReportVersion": 2}"#);
        assert_eq!(outcome.data.unwrap().vulnerability_count(), 0);
    }

    #[test]
    fn garbage_output_is_a_parse_failure() {
        let outcome = parse("not json");
        assert!(outcome.data.is_none());
        assert!(outcome.error.is_some());
    }

    #[tokio::test]
    async fn ci_mode_returns_canned_data() {
        let outcome = run(Path::new("/nonexistent"), true).await;
        assert_eq!(outcome.data.unwrap().vulnerability_count(), 3);
    }
}
