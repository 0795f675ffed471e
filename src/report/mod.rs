// src/report/mod.rs
// =============================================================================
// The run report: what was checked, what failed, and the summary.
//
// Submodules:
// - sink: console / JSON rendering and persisting the report to a file
//
// A `Report` is filled in check by check while the run progresses, then
// sealed exactly once with `finish` (normal completion) or `finish_aborted`
// (fail-fast or fatal error). The summary is always derived from `results`,
// so a partial run still gets honest counts.
// =============================================================================

mod sink;

pub use sink::emit;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::checks::{AuditError, CheckItemResult, SitemapSnapshot};
use crate::config::AuditConfig;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportOptions {
    pub fail_fast: bool,
    pub max_retries: u32,
    pub concurrency: usize,
    pub timeout_ms: u64,
}

/// Results per check, in run order. A check that never ran stays `None`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sitemap: Option<SitemapSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical: Option<Vec<CheckItemResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blog_metadata_parity: Option<Vec<CheckItemResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub robots_policy: Option<CheckItemResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_noindex: Option<CheckItemResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legacy_redirects: Option<Vec<CheckItemResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_consolidation: Option<Vec<CheckItemResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soft404: Option<Vec<CheckItemResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed_urls: Option<Vec<CheckItemResult>>,
}

/// One item-based section of the results, for tallies and console output.
pub struct Section<'a> {
    pub key: &'static str,
    pub title: &'static str,
    pub items: Vec<&'a CheckItemResult>,
}

impl CheckResults {
    // Item-based checks that have run, in run order (the sitemap is
    // reported separately).
    pub fn sections(&self) -> Vec<Section<'_>> {
        fn many<'a>(items: &'a Option<Vec<CheckItemResult>>) -> Option<Vec<&'a CheckItemResult>> {
            items.as_ref().map(|items| items.iter().collect())
        }
        fn one(item: &Option<CheckItemResult>) -> Option<Vec<&CheckItemResult>> {
            item.as_ref().map(|item| vec![item])
        }

        let sections = [
            ("canonical", "Canonical Verification", many(&self.canonical)),
            (
                "blogMetadataParity",
                "Blog Metadata Parity",
                many(&self.blog_metadata_parity),
            ),
            ("robotsPolicy", "Robots Policy", one(&self.robots_policy)),
            ("searchNoindex", "Search Noindex", one(&self.search_noindex)),
            ("legacyRedirects", "Legacy Redirects", many(&self.legacy_redirects)),
            (
                "hostConsolidation",
                "Host Consolidation",
                many(&self.host_consolidation),
            ),
            ("soft404", "Soft 404 Checks", many(&self.soft404)),
            ("removedUrls", "Removed URLs (410 Gone)", many(&self.removed_urls)),
        ];

        sections
            .into_iter()
            .filter_map(|(key, title, items)| items.map(|items| Section { key, title, items }))
            .collect()
    }

    /// Every issue string across every check (sitemap entries included).
    pub fn total_issues(&self) -> usize {
        let sitemap = self.sitemap.as_ref().map(|s| s.invalid.len()).unwrap_or(0);
        let items: usize = self
            .sections()
            .iter()
            .flat_map(|section| section.items.iter())
            .map(|item| item.issues.len())
            .sum();
        sitemap + items
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckTally {
    pub total: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_issues: usize,
    pub passed: bool,
    pub duration_seconds: f64,
    pub checks: BTreeMap<String, CheckTally>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_fast: Option<bool>,
}

impl Summary {
    pub fn from_results(results: &CheckResults, elapsed: Duration) -> Self {
        let mut checks = BTreeMap::new();
        if let Some(sitemap) = &results.sitemap {
            checks.insert(
                "sitemap".to_string(),
                CheckTally {
                    total: sitemap.count,
                    failed: sitemap.invalid.len(),
                },
            );
        }
        for section in results.sections() {
            checks.insert(
                section.key.to_string(),
                CheckTally {
                    total: section.items.len(),
                    failed: section.items.iter().filter(|item| !item.passed()).count(),
                },
            );
        }

        let total_issues = results.total_issues();
        Summary {
            total_issues,
            passed: total_issues == 0,
            duration_seconds: round_seconds(elapsed),
            checks,
            error: None,
            fail_fast: None,
        }
    }
}

// Two decimals, like the console line.
fn round_seconds(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub timestamp: String,
    pub site: String,
    pub options: ReportOptions,
    pub results: CheckResults,
    pub summary: Summary,
}

impl Report {
    pub fn new(config: &AuditConfig, fail_fast: bool) -> Self {
        Report {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            site: config.site.clone(),
            options: ReportOptions {
                fail_fast,
                max_retries: config.max_retries,
                concurrency: config.concurrency,
                timeout_ms: config.timeout_ms,
            },
            results: CheckResults::default(),
            summary: Summary::default(),
        }
    }

    /// Seals a run that completed every check.
    pub fn finish(&mut self, elapsed: Duration) {
        self.summary = Summary::from_results(&self.results, elapsed);
    }

    /// Seals a run that stopped early; it never passes.
    pub fn finish_aborted(&mut self, elapsed: Duration, error: &AuditError) {
        let mut summary = Summary::from_results(&self.results, elapsed);
        summary.passed = false;
        summary.error = Some(error.to_string());
        if error.is_fail_fast() {
            summary.fail_fast = Some(true);
        }
        self.summary = summary;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::InvalidLoc;

    fn item(subject: &str, issues: &[&str]) -> CheckItemResult {
        let mut item = CheckItemResult::new(subject);
        item.issues = issues.iter().map(|s| s.to_string()).collect();
        item
    }

    fn results() -> CheckResults {
        CheckResults {
            sitemap: Some(SitemapSnapshot {
                count: 3,
                locs: vec!["https://example.com/a".into(), "https://example.com/b".into()],
                invalid: vec![InvalidLoc {
                    loc: "https://example.com/a".into(),
                    reason: "Duplicate URL in sitemap".into(),
                }],
            }),
            canonical: Some(vec![
                item("https://example.com/a", &[]),
                item("https://example.com/b", &["Missing canonical tag", "Final URL not on canonical host"]),
            ]),
            robots_policy: Some(item("https://example.com/robots.txt", &["Missing robots directive: Allow: /"])),
            ..CheckResults::default()
        }
    }

    #[test]
    fn test_total_issues_counts_every_issue() {
        let summary = Summary::from_results(&results(), Duration::from_millis(1234));
        assert_eq!(summary.total_issues, 4);
        assert!(!summary.passed);
        assert_eq!(summary.duration_seconds, 1.23);
        assert_eq!(summary.checks["sitemap"], CheckTally { total: 3, failed: 1 });
        assert_eq!(summary.checks["canonical"], CheckTally { total: 2, failed: 1 });
        assert_eq!(summary.checks["robotsPolicy"], CheckTally { total: 1, failed: 1 });
        assert!(!summary.checks.contains_key("removedUrls"));
    }

    #[test]
    fn test_clean_results_pass() {
        let results = CheckResults {
            canonical: Some(vec![item("https://example.com/a", &[])]),
            removed_urls: Some(Vec::new()),
            ..CheckResults::default()
        };
        let summary = Summary::from_results(&results, Duration::ZERO);
        assert!(summary.passed);
        assert_eq!(summary.total_issues, 0);
        assert_eq!(summary.checks["removedUrls"], CheckTally { total: 0, failed: 0 });
    }

    #[test]
    fn test_aborted_report_never_passes() {
        let config = AuditConfig::default().with_site("https://example.com");
        let mut report = Report::new(&config, true);
        report.finish_aborted(
            Duration::from_secs(1),
            &AuditError::FailFast("https://example.com/a - Missing canonical tag".into()),
        );
        assert!(!report.summary.passed);
        assert_eq!(report.summary.fail_fast, Some(true));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["summary"]["failFast"], true);
        assert_eq!(
            json["summary"]["error"],
            "Fail-fast triggered: https://example.com/a - Missing canonical tag"
        );
        assert_eq!(json["options"]["failFast"], true);
        assert!(json["results"].as_object().unwrap().is_empty());

        let mut fatal = Report::new(&config, false);
        fatal.finish_aborted(Duration::ZERO, &AuditError::Fatal("Sitemap fetch failed: HTTP 500".into()));
        assert_eq!(fatal.summary.fail_fast, None);
        assert!(!fatal.summary.passed);
    }

    #[test]
    fn test_json_uses_documented_keys() {
        let mut results = results();
        results.blog_metadata_parity = Some(Vec::new());
        results.soft404 = Some(Vec::new());
        let json = serde_json::to_value(&results).unwrap();
        for key in ["sitemap", "canonical", "blogMetadataParity", "robotsPolicy", "soft404"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
