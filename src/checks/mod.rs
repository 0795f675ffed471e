// src/checks/mod.rs
// =============================================================================
// This module contains the verification checks.
//
// Submodules:
// - sitemap: sitemap integrity (the seed list for the per-URL checks)
// - canonical: per-URL canonical tag consistency
// - blog: blog post metadata parity (canonical / og:url / JSON-LD)
// - policy: robots.txt directives and the search page's noindex
// - redirects: legacy redirects, host consolidation, soft 404s, removed URLs
//
// Every check reports problems as human-readable issue strings on a
// `CheckItemResult`; an empty list means the subject passed. Fetch failures
// for a single subject become an "Error: ..." issue. Only two things stop a
// run: a fail-fast abort and a fatal failure to load a mandatory document.
// =============================================================================

mod blog;
mod canonical;
mod policy;
mod redirects;
mod sitemap;

pub use blog::check_blog_metadata;
pub use canonical::check_canonical_urls;
pub use policy::{check_robots_policy, check_search_noindex};
pub use redirects::{
    check_host_consolidation, check_legacy_redirects, check_removed_urls, check_soft_404s,
};
pub use sitemap::{check_sitemap, InvalidLoc, SitemapSnapshot};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::AuditConfig;
use crate::fetch::{FetchError, FetchOutcome, Fetcher, RedirectHop};

/// Why a run stopped before every check completed.
#[derive(Debug, Clone, Error)]
pub enum AuditError {
    /// A check found an issue while fail-fast mode is on
    #[error("Fail-fast triggered: {0}")]
    FailFast(String),

    /// A mandatory document (sitemap, robots.txt) could not be loaded
    #[error("{0}")]
    Fatal(String),
}

impl AuditError {
    pub fn is_fail_fast(&self) -> bool {
        matches!(self, AuditError::FailFast(_))
    }
}

/// Outcome of verifying one subject (a URL or a fixed entry from the config).
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckItemResult {
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub issues: Vec<String>,
    pub chain: Vec<RedirectHop>,
    pub retries: u32,
}

impl CheckItemResult {
    pub fn new(subject: impl Into<String>) -> Self {
        CheckItemResult {
            subject: subject.into(),
            ..CheckItemResult::default()
        }
    }

    // Copies the redirect chain, final URL and terminal status of a fetch.
    pub fn from_outcome(subject: impl Into<String>, outcome: &FetchOutcome) -> Self {
        CheckItemResult {
            final_url: Some(outcome.final_url.clone()),
            status: Some(outcome.response.status),
            chain: outcome.chain.clone(),
            retries: outcome.retries,
            ..CheckItemResult::new(subject)
        }
    }

    // A subject whose fetch never succeeded: one "Error: ..." issue.
    pub fn fetch_failed(subject: impl Into<String>, error: &FetchError, max_retries: u32) -> Self {
        CheckItemResult {
            issues: vec![format!("Error: {error}")],
            retries: max_retries,
            ..CheckItemResult::new(subject)
        }
    }

    pub fn passed(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Shared inputs for every check in a run.
pub struct CheckContext<'a> {
    pub config: &'a AuditConfig,
    pub fetcher: &'a Fetcher,
    pub fail_fast: bool,
}

impl<'a> CheckContext<'a> {
    pub fn new(config: &'a AuditConfig, fetcher: &'a Fetcher, fail_fast: bool) -> Self {
        CheckContext {
            config,
            fetcher,
            fail_fast,
        }
    }

    // Raises the fail-fast signal when enabled and issues were found.
    pub fn ensure_clean(&self, subject: &str, issues: &[String]) -> Result<(), AuditError> {
        if self.fail_fast && !issues.is_empty() {
            return Err(AuditError::FailFast(format!(
                "{} - {}",
                subject,
                issues.join(", ")
            )));
        }
        Ok(())
    }

    // Logs a finished subject and applies fail-fast.
    pub fn finish(&self, result: CheckItemResult) -> Result<CheckItemResult, AuditError> {
        if result.passed() {
            debug!(subject = %result.subject, "passed");
        } else {
            info!(subject = %result.subject, issues = result.issues.len(), "failed");
        }
        self.ensure_clean(&result.subject, &result.issues)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_fast_only_when_enabled_and_dirty() {
        let config = AuditConfig::default().with_site("https://example.com");
        let fetcher = Fetcher::new(&config).unwrap();
        let issues = vec!["Missing canonical tag".to_string()];

        let lenient = CheckContext::new(&config, &fetcher, false);
        assert!(lenient.ensure_clean("https://example.com/a", &issues).is_ok());

        let strict = CheckContext::new(&config, &fetcher, true);
        assert!(strict.ensure_clean("https://example.com/a", &[]).is_ok());
        let err = strict
            .ensure_clean("https://example.com/a", &issues)
            .unwrap_err();
        assert!(err.is_fail_fast());
        assert_eq!(
            err.to_string(),
            "Fail-fast triggered: https://example.com/a - Missing canonical tag"
        );
    }

    #[test]
    fn test_item_result_serializes_camel_case_and_skips_empty() {
        let mut item = CheckItemResult::new("https://example.com/a");
        item.final_url = Some("https://example.com/b".to_string());
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["finalUrl"], "https://example.com/b");
        assert!(json.get("canonical").is_none());
        assert_eq!(json["issues"], serde_json::json!([]));
    }
}
