// src/checks/canonical.rs
// =============================================================================
// Per-URL canonical verification.
//
// For each sitemap URL, after following redirects:
// - the final URL must be on the canonical origin
// - the page must declare a canonical on the canonical origin
// - the canonical must equal the final URL (a canonical pointing at the
//   homepage from any other page gets its own message)
// - the canonical must not end in '/' unless it is allow-listed
//
// Duplicate canonical tags are resolved "last one wins" and only logged.
// =============================================================================

use tracing::warn;

use super::{AuditError, CheckContext, CheckItemResult};
use crate::config::AuditConfig;
use crate::crawl::run_with_concurrency;
use crate::extract::{
    canonical_links, extract_canonical, is_canonical_url, normalize_url, to_absolute_normalized,
};

pub async fn check_canonical_urls(
    ctx: &CheckContext<'_>,
    urls: &[String],
) -> Result<Vec<CheckItemResult>, AuditError> {
    run_with_concurrency(urls, ctx.config.concurrency, |url| check_canonical(ctx, url)).await
}

async fn check_canonical(ctx: &CheckContext<'_>, url: &str) -> Result<CheckItemResult, AuditError> {
    let outcome = match ctx.fetcher.get(url).await {
        Ok(outcome) => outcome,
        Err(e) => {
            let result = CheckItemResult::fetch_failed(url, &e, ctx.fetcher.max_retries());
            return ctx.finish(result);
        }
    };

    let mut result = CheckItemResult::from_outcome(url, &outcome);
    if !outcome.response.is_success() {
        result.issues.push(format!("HTTP {}", outcome.response.status));
        return ctx.finish(result);
    }

    let html = &outcome.response.body;
    let tags = canonical_links(html).len();
    if tags > 1 {
        warn!(url, tags, "multiple canonical tags, using the last one");
    }

    let (final_url, canonical, issues) = canonical_issues(ctx.config, &outcome.final_url, html);
    result.final_url = Some(final_url);
    result.canonical = canonical;
    result.issues = issues;
    ctx.finish(result)
}

// Evaluates a fetched page. Returns (normalized final URL, normalized
// canonical, issues).
pub fn canonical_issues(
    config: &AuditConfig,
    final_url: &str,
    html: &str,
) -> (String, Option<String>, Vec<String>) {
    let site = &config.site;
    let home = config.home_url();
    let final_normalized = normalize_url(final_url).unwrap_or_else(|| final_url.to_string());
    let canonical = extract_canonical(html).and_then(|href| to_absolute_normalized(&href, final_url));

    let mut issues = Vec::new();
    if !is_canonical_url(&final_normalized, site) {
        issues.push("Final URL not on canonical host".to_string());
    }

    match &canonical {
        None => issues.push("Missing canonical tag".to_string()),
        Some(canonical) => {
            if !is_canonical_url(canonical, site) {
                issues.push("Canonical not on canonical host".to_string());
            }
            if *canonical != final_normalized {
                if *canonical == home && final_normalized != home {
                    issues.push("Canonical points to homepage for non-home page".to_string());
                } else {
                    issues.push(format!(
                        "Canonical mismatch (expected {final_normalized}, got {canonical})"
                    ));
                }
            }
            if canonical.ends_with('/') && !trailing_slash_allowed(config, canonical) {
                issues.push("Canonical has trailing slash (should be normalized)".to_string());
            }
        }
    }

    (final_normalized, canonical, issues)
}

fn trailing_slash_allowed(config: &AuditConfig, canonical: &str) -> bool {
    config
        .trailing_slash_allow_list
        .iter()
        .map(|entry| config.expand(entry))
        .any(|entry| entry == canonical)
}
