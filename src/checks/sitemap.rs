// src/checks/sitemap.rs
// =============================================================================
// Sitemap integrity.
//
// Each <loc> must be unique, live on the canonical origin, contain no
// whitespace, have no "//" in its path and never mention "/home". Only the
// first failing rule is reported for a given entry. The snapshot's `locs`
// (trimmed, de-duplicated) seed the per-URL checks.
// =============================================================================

use serde::Serialize;
use std::collections::HashSet;
use tracing::info;

use super::{AuditError, CheckContext};
use crate::config::AuditConfig;
use crate::extract::extract_locs;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidLoc {
    pub loc: String,
    pub reason: String,
}

/// The sitemap as it was at the time of the run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SitemapSnapshot {
    /// Number of <loc> entries in the document
    pub count: usize,
    pub locs: Vec<String>,
    pub invalid: Vec<InvalidLoc>,
}

// Fetches and validates the sitemap. Failing to load it is fatal: every
// per-URL check depends on it.
pub async fn check_sitemap(ctx: &CheckContext<'_>) -> Result<SitemapSnapshot, AuditError> {
    let url = ctx.config.sitemap_url();
    let outcome = ctx
        .fetcher
        .get(&url)
        .await
        .map_err(|e| AuditError::Fatal(format!("Sitemap fetch failed: {e}")))?;

    if !outcome.response.is_success() {
        return Err(AuditError::Fatal(format!(
            "Sitemap fetch failed: HTTP {}",
            outcome.response.status
        )));
    }

    let snapshot = validate_sitemap(&outcome.response.body, ctx.config);
    info!(
        count = snapshot.count,
        invalid = snapshot.invalid.len(),
        "sitemap parsed"
    );
    Ok(snapshot)
}

pub fn validate_sitemap(xml: &str, config: &AuditConfig) -> SitemapSnapshot {
    let raw_locs = extract_locs(xml);
    let site_prefix = format!("{}/", config.site);
    let mut seen = HashSet::new();
    let mut locs = Vec::new();
    let mut invalid = Vec::new();

    for loc in &raw_locs {
        let trimmed = loc.trim();

        if !seen.insert(trimmed.to_string()) {
            invalid.push(invalid_loc(loc, "Duplicate URL in sitemap"));
            continue;
        }
        locs.push(trimmed.to_string());

        let reason = if trimmed != config.site && !trimmed.starts_with(&site_prefix) {
            Some("Non-canonical host or protocol")
        } else if has_whitespace(loc) {
            Some("Whitespace detected in <loc>")
        } else if trimmed[config.site.len()..].contains("//") {
            Some("Double slashes in path")
        } else if trimmed.contains("/home") {
            Some("Non-canonical /home in sitemap")
        } else {
            None
        };

        if let Some(reason) = reason {
            invalid.push(invalid_loc(loc, reason));
        }
    }

    SitemapSnapshot {
        count: raw_locs.len(),
        locs,
        invalid,
    }
}

fn invalid_loc(loc: &str, reason: &str) -> InvalidLoc {
    InvalidLoc {
        loc: loc.to_string(),
        reason: reason.to_string(),
    }
}

fn has_whitespace(value: &str) -> bool {
    value.chars().any(char::is_whitespace)
}

impl SitemapSnapshot {
    /// "loc (reason)" strings, used for fail-fast and console output.
    pub fn issues(&self) -> Vec<String> {
        self.invalid
            .iter()
            .map(|entry| format!("{} ({})", entry.loc, entry.reason))
            .collect()
    }
}
