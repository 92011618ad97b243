//! Unused dependency check backed by the depcheck static analyzer.

use super::{capture_stdout, CheckOutcome};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnusedData {
    /// Declared runtime dependencies no source file imports.
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: Vec<String>,
}

pub async fn run(root: &Path, ci_mode: bool) -> CheckOutcome<UnusedData> {
    if ci_mode {
        return CheckOutcome::ok(UnusedData {
            dependencies: vec!["mock-unused".to_string()],
            dev_dependencies: Vec::new(),
        });
    }

    match capture_stdout("npx", &["depcheck", "--json"], root).await {
        Ok(stdout) => parse(&stdout),
        Err(e) => CheckOutcome::failed(e),
    }
}

fn parse(stdout: &str) -> CheckOutcome<UnusedData> {
    if stdout.trim().is_empty() {
        return CheckOutcome::clean();
    }
    match serde_json::from_str::<UnusedData>(stdout) {
        Ok(data) => CheckOutcome::ok(data),
        Err(_) => CheckOutcome::failed("failed to parse depcheck output"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_depcheck_output() {
        let raw = r#"{
            "dependencies": ["lodash"],
            "devDependencies": ["jest"],
            "missing": {},
            "using": {"chalk": ["/src/index.js"]}
        }"#;
        let data = parse(raw).data.unwrap();
        assert_eq!(data.dependencies, vec!["lodash"]);
        assert_eq!(data.dev_dependencies, vec!["jest"]);
    }

    #[test]
    fn garbage_output_is_a_parse_failure() {
        let outcome = parse("depcheck blew up");
        assert!(outcome.data.is_none());
        assert!(outcome.error.is_some());
    }

    #[tokio::test]
    async fn ci_mode_returns_canned_data() {
        let outcome = run(Path::new("/nonexistent"), true).await;
        assert_eq!(outcome.data.unwrap().dependencies, vec!["mock-unused"]);
    }
}
