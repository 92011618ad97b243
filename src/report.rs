//! JSON and Markdown health reports.

use crate::checks::CheckOutcome;
use crate::output::HealthResults;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Reports land in this directory under the project root.
pub const REPORTS_DIR: &str = "reports";

/// Write both report files, creating the reports directory if absent.
/// Returns the path of the Markdown report.
pub fn write(root: &Path, results: &HealthResults) -> Result<PathBuf> {
    let dir = root.join(REPORTS_DIR);
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let json = serde_json::to_string_pretty(results).context("failed to serialize results")?;
    fs::write(dir.join("project-health.json"), json).context("failed to write JSON report")?;

    let md_path = dir.join("project-health.md");
    fs::write(&md_path, render_markdown(results)).context("failed to write Markdown report")?;
    Ok(md_path)
}

fn render_markdown(results: &HealthResults) -> String {
    let mut md = String::new();
    md.push_str("# Project Health Report\n\n");
    md.push_str(&format!("Generated: {}\n\n", Utc::now().to_rfc3339()));

    md.push_str("## Dependencies\n\n");
    push_json_block(&mut md, &results.outdated);
    md.push_str("## Security Audit\n\n");
    push_json_block(&mut md, &results.audit);
    md.push_str("## Unused Dependencies\n\n");
    push_json_block(&mut md, &results.unused);

    md.push_str("## Large Files\n\n");
    if let Some(data) = results.large_files.as_ref().and_then(|check| check.data.as_ref()) {
        for file in &data.files {
            md.push_str(&format!("- {} ({} MB)\n", file.path.display(), file.size_mb()));
        }
    }
    md.push('\n');

    md.push_str("## Test Files\n\n");
    if let Some(data) = results.test_files.as_ref().and_then(|check| check.data.as_ref()) {
        for file in &data.files {
            md.push_str(&format!("- {}\n", file.display()));
        }
    }
    md.push('\n');
    md
}

fn push_json_block<T: Serialize>(md: &mut String, check: &Option<CheckOutcome<T>>) {
    let rendered = check
        .as_ref()
        .map(|outcome| {
            serde_json::to_string_pretty(outcome).unwrap_or_else(|_| "null".to_string())
        })
        .unwrap_or_else(|| "null".to_string());
    md.push_str("```json\n");
    md.push_str(&rendered);
    md.push_str("\n```\n\n");
}
