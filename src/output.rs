//! Terminal rendering of check results.

use crate::checks::audit::AuditData;
use crate::checks::large_files::LargeFilesData;
use crate::checks::outdated::OutdatedData;
use crate::checks::test_files::TestFilesData;
use crate::checks::unused::UnusedData;
use crate::checks::CheckOutcome;
use anyhow::{Context, Result};
use colored::*;
use serde::Serialize;

/// Output verbosity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Quiet,   // Only errors
    Normal,  // Standard output
    Verbose, // Scan diagnostics too
}

/// Aggregate of every executed check. A `None` field means the check was
/// not requested on this run.
#[derive(Debug, Default, Serialize)]
pub struct HealthResults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outdated: Option<CheckOutcome<OutdatedData>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit: Option<CheckOutcome<AuditData>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unused: Option<CheckOutcome<UnusedData>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_files: Option<CheckOutcome<LargeFilesData>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_files: Option<CheckOutcome<TestFilesData>>,
}

impl HealthResults {
    pub fn outdated_count(&self) -> usize {
        self.outdated
            .as_ref()
            .and_then(|check| check.data.as_ref())
            .map(|data| data.len())
            .unwrap_or(0)
    }

    pub fn vulnerability_count(&self) -> u64 {
        self.audit
            .as_ref()
            .and_then(|check| check.data.as_ref())
            .map(|data| data.vulnerability_count())
            .unwrap_or(0)
    }

    /// Unused runtime dependencies; dev dependencies are reported but do
    /// not count as issues.
    pub fn unused_count(&self) -> usize {
        self.unused
            .as_ref()
            .and_then(|check| check.data.as_ref())
            .map(|data| data.dependencies.len())
            .unwrap_or(0)
    }

    pub fn large_file_count(&self) -> usize {
        self.large_files
            .as_ref()
            .and_then(|check| check.data.as_ref())
            .map(|data| data.files.len())
            .unwrap_or(0)
    }

    /// Zero test files is an issue; an unrequested check is not.
    pub fn missing_tests(&self) -> bool {
        self.test_files
            .as_ref()
            .map(|check| {
                check
                    .data
                    .as_ref()
                    .map(|data| data.files.is_empty())
                    .unwrap_or(true)
            })
            .unwrap_or(false)
    }

    pub fn has_issues(&self) -> bool {
        self.outdated_count() > 0
            || self.vulnerability_count() > 0
            || self.unused_count() > 0
            || self.large_file_count() > 0
            || self.missing_tests()
    }
}

pub fn print_human(results: &HealthResults, mode: OutputMode) {
    if mode == OutputMode::Quiet {
        return;
    }

    if let Some(check) = &results.outdated {
        println!();
        println!("{}", "Outdated dependencies:".yellow().bold());
        print_check_error(check.error.as_deref());
        match &check.data {
            Some(packages) if !packages.is_empty() => {
                for (name, info) in packages {
                    println!(
                        "- {}: current {}, latest {}",
                        name.yellow(),
                        info.current.as_deref().unwrap_or("?"),
                        info.latest.as_deref().unwrap_or("?")
                    );
                }
                println!(
                    "{}",
                    "Suggestion: run \"npm update\" to update dependencies.".cyan()
                );
            }
            _ => println!("{}", "All dependencies are up to date.".green()),
        }
    }

    if let Some(check) = &results.audit {
        println!();
        println!("{}", "Vulnerabilities:".red().bold());
        print_check_error(check.error.as_deref());
        let count = results.vulnerability_count();
        if count > 0 {
            println!("{}", format!("{count} found").red().bold());
            println!(
                "{}",
                "Suggestion: run \"npm audit fix\" to address vulnerabilities.".cyan()
            );
        } else {
            println!("{}", "No vulnerabilities found.".green());
        }
    }

    if let Some(check) = &results.unused {
        println!();
        println!("{}", "Unused dependencies:".yellow().bold());
        print_check_error(check.error.as_deref());
        match &check.data {
            Some(data) if !data.dependencies.is_empty() => {
                for dep in &data.dependencies {
                    println!("- {}", dep.yellow());
                }
                println!(
                    "{}",
                    "Suggestion: remove unused packages with \"npm uninstall <package>\".".cyan()
                );
            }
            _ => println!("{}", "No unused dependencies found.".green()),
        }
    }

    if let Some(check) = &results.large_files {
        println!();
        println!("{}", "Large files:".yellow().bold());
        print_check_error(check.error.as_deref());
        match &check.data {
            Some(data) if !data.files.is_empty() => {
                for file in &data.files {
                    println!(
                        "{}",
                        format!("- {} ({} MB)", file.path.display(), file.size_mb()).yellow()
                    );
                }
                println!(
                    "{}",
                    "Suggestion: remove or compress large files if not needed.".cyan()
                );
            }
            _ => println!("{}", "No large files found.".green()),
        }
        if mode == OutputMode::Verbose {
            if let Some(data) = &check.data {
                println!(
                    "  {} files scanned, {} skipped",
                    data.total_scanned, data.skipped
                );
            }
        }
    }

    if let Some(check) = &results.test_files {
        println!();
        println!("{}", "Test files:".yellow().bold());
        print_check_error(check.error.as_deref());
        match &check.data {
            Some(data) if !data.files.is_empty() => {
                println!("{}", format!("{} test files found", data.files.len()).green());
                for file in &data.files {
                    println!("- {}", file.display().to_string().dimmed());
                }
            }
            _ => {
                println!("{}", "No test files found.".red().bold());
                println!("{}", "Suggestion: add tests to improve code quality.".cyan());
            }
        }
    }
}

/// A check that could not run is rendered distinctly from a clean check,
/// but still does not count as an issue.
fn print_check_error(error: Option<&str>) {
    if let Some(error) = error {
        eprintln!("{} {}", "Warning:".yellow(), error);
    }
}

pub fn print_summary(results: &HealthResults, mode: OutputMode) {
    if mode == OutputMode::Quiet {
        return;
    }

    println!();
    println!("{}", "Summary:".bold());

    let outdated = results.outdated_count();
    let unused = results.unused_count();
    if outdated > 0 || unused > 0 {
        println!(
            "{}",
            format!("Dependencies: {outdated} outdated, {unused} unused").yellow()
        );
    } else {
        println!("{}", "Dependencies: all up to date and used.".green());
    }

    let vulns = results.vulnerability_count();
    if vulns > 0 {
        println!("{}", format!("Vulnerabilities: {vulns} found").red().bold());
    } else {
        println!("{}", "Vulnerabilities: none".green());
    }

    if results.missing_tests() {
        println!("{}", "Tests: no test files found".red().bold());
    } else {
        let count = results
            .test_files
            .as_ref()
            .and_then(|check| check.data.as_ref())
            .map(|data| data.files.len())
            .unwrap_or(0);
        println!("{}", format!("Tests: {count} test files found").green());
    }

    let large = results.large_file_count();
    if large > 0 {
        println!("{}", format!("Large files: {large} found").yellow());
    } else {
        println!("{}", "Large files: none".green());
    }
}

pub fn print_json(results: &HealthResults) -> Result<()> {
    let json =
        serde_json::to_string_pretty(results).context("failed to serialize results to JSON")?;
    println!("{json}");
    Ok(())
}
