// src/report/sink.rs
// =============================================================================
// Output for a finished report.
//
// - JSON: the whole report, pretty-printed, on stdout (--json)
// - Console: one section per check with ✅/❌ per subject, then a final
//   PASSED / FAILED line with the issue count and duration
// - File: the JSON report written to --output, in either mode
//
// Console text is built as a String first so it can be tested.
// =============================================================================

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::Path;

use super::Report;
use crate::checks::CheckItemResult;

pub fn render_json(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report")
}

// How a subject is labelled on the console.
fn label(section_key: &str, item: &CheckItemResult) -> String {
    match (section_key, &item.expected) {
        ("legacyRedirects", Some(expected)) => format!("{} -> {}", item.subject, expected),
        _ => item.subject.clone(),
    }
}

pub fn render_console(report: &Report) -> String {
    let mut out = String::new();
    let results = &report.results;

    if let Some(sitemap) = &results.sitemap {
        let _ = writeln!(out, "\n=== Sitemap ===");
        let _ = writeln!(out, "Total URLs: {}", sitemap.count);
        if sitemap.invalid.is_empty() {
            let _ = writeln!(out, "✅ Sitemap entries are valid");
        } else {
            let _ = writeln!(out, "❌ Invalid sitemap entries:");
            for entry in &sitemap.invalid {
                let _ = writeln!(out, "   - {} ({})", entry.loc, entry.reason);
            }
        }
    }

    for section in results.sections() {
        let _ = writeln!(out, "\n=== {} ===", section.title);
        if section.items.is_empty() {
            let _ = writeln!(out, "(nothing to check)");
        }
        for item in &section.items {
            let marker = if item.passed() { "✅" } else { "❌" };
            let _ = writeln!(out, "{} {}", marker, label(section.key, item));
            for issue in &item.issues {
                let _ = writeln!(out, "   - {}", issue);
            }
        }
    }

    let summary = &report.summary;
    let verdict = if summary.passed { "✅ PASSED" } else { "❌ FAILED" };
    let _ = writeln!(
        out,
        "\nFinal Result: {} ({} issue(s) in {:.2}s)",
        verdict, summary.total_issues, summary.duration_seconds
    );
    out
}

// Prints the report in the requested format and persists it if asked.
pub fn emit(report: &Report, json: bool, output: Option<&Path>) -> Result<()> {
    if json {
        println!("{}", render_json(report)?);
    } else {
        if let Some(error) = &report.summary.error {
            if report.summary.fail_fast == Some(true) {
                eprintln!("\n❌ {}", error);
            } else {
                eprintln!("❌ Fatal error: {}", error);
            }
        }
        print!("{}", render_console(report));
    }

    if let Some(path) = output {
        std::fs::write(path, render_json(report)?)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        if !json {
            println!("\n📄 JSON report saved to: {}", path.display());
        }
    }

    Ok(())
}
