// src/checks/blog.rs
// =============================================================================
// Blog metadata parity.
//
// Every blog post in the sitemap must agree with itself about its own
// address: the canonical tag, og:url, every BlogPosting.mainEntityOfPage and
// the leaf of every BreadcrumbList must all name the same URL as the page's
// final URL.
// =============================================================================

use url::Url;

use super::{AuditError, CheckContext, CheckItemResult};
use crate::config::AuditConfig;
use crate::crawl::run_with_concurrency;
use crate::extract::{
    extract_blog_schema_signals, extract_canonical, extract_meta_value, normalize_url,
    to_absolute_normalized,
};

// Sitemap URLs that are blog posts: under the blog prefix, but not the blog
// index itself.
pub fn blog_post_urls(config: &AuditConfig, locs: &[String]) -> Vec<String> {
    let prefix = config.blog_prefix.as_str();
    locs.iter()
        .filter(|loc| {
            Url::parse(loc)
                .map(|url| url.path().starts_with(prefix) && url.path().len() > prefix.len())
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

pub async fn check_blog_metadata(
    ctx: &CheckContext<'_>,
    locs: &[String],
) -> Result<Vec<CheckItemResult>, AuditError> {
    let posts = blog_post_urls(ctx.config, locs);
    run_with_concurrency(&posts, ctx.config.concurrency, |url| check_blog_post(ctx, url)).await
}

async fn check_blog_post(ctx: &CheckContext<'_>, url: &str) -> Result<CheckItemResult, AuditError> {
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

    let final_url = normalize_url(&outcome.final_url).unwrap_or_else(|| outcome.final_url.clone());
    let (canonical, issues) = blog_issues(&outcome.final_url, &outcome.response.body);
    result.final_url = Some(final_url);
    result.canonical = canonical;
    result.issues = issues;
    ctx.finish(result)
}

pub fn blog_issues(final_url: &str, html: &str) -> (Option<String>, Vec<String>) {
    let final_normalized = normalize_url(final_url).unwrap_or_else(|| final_url.to_string());
    let resolve = |href: &str| to_absolute_normalized(href, final_url);
    let mut issues = Vec::new();

    let canonical = extract_canonical(html).and_then(|href| resolve(&href));
    match &canonical {
        None => issues.push("Missing canonical tag".to_string()),
        Some(canonical) if *canonical != final_normalized => issues.push(format!(
            "Canonical mismatch (expected {final_normalized}, got {canonical})"
        )),
        Some(_) => {}
    }

    // Everything else is compared against the canonical, or the final URL
    // when the canonical is missing.
    let reference = canonical.clone().unwrap_or_else(|| final_normalized.clone());

    match extract_meta_value(html, "og:url", "property") {
        None => issues.push("Missing og:url meta tag".to_string()),
        Some(og_url) => {
            let og_url = resolve(&og_url).unwrap_or(og_url);
            if og_url != reference {
                issues.push(format!("og:url mismatch (expected {reference}, got {og_url})"));
            }
        }
    }

    let signals = extract_blog_schema_signals(html);
    if signals.blog_posting_count == 0 || signals.main_entity_urls.is_empty() {
        issues.push("Missing BlogPosting mainEntityOfPage".to_string());
    }
    for main_entity in &signals.main_entity_urls {
        let main_entity = resolve(main_entity).unwrap_or_else(|| main_entity.clone());
        if main_entity != reference {
            issues.push(format!(
                "BlogPosting mainEntityOfPage mismatch (expected {reference}, got {main_entity})"
            ));
        }
    }

    if signals.breadcrumb_count == 0 {
        issues.push("Missing BreadcrumbList".to_string());
    }
    for leaf in &signals.breadcrumb_leaf_urls {
        let leaf = resolve(leaf).unwrap_or_else(|| leaf.clone());
        if leaf != reference {
            issues.push(format!(
                "Breadcrumb leaf mismatch (expected {reference}, got {leaf})"
            ));
        }
    }

    (canonical, issues)
}
