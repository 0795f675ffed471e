// src/checks/policy.rs
// =============================================================================
// Crawl policy checks: robots.txt content and the search page's noindex.
//
// robots.txt is mandatory, so failing to load it aborts the run. The search
// page is an ordinary subject: a failed fetch is recorded as an issue.
// =============================================================================

use tracing::info;

use super::{AuditError, CheckContext, CheckItemResult};
use crate::config::AuditConfig;
use crate::extract::{extract_canonical, extract_meta_value, normalize_url, to_absolute_normalized};

pub async fn check_robots_policy(ctx: &CheckContext<'_>) -> Result<CheckItemResult, AuditError> {
    let url = ctx.config.robots_url();
    let outcome = ctx
        .fetcher
        .get(&url)
        .await
        .map_err(|e| AuditError::Fatal(format!("Robots policy fetch failed: {e}")))?;

    if !outcome.response.is_success() {
        return Err(AuditError::Fatal(format!(
            "Robots policy fetch failed: HTTP {}",
            outcome.response.status
        )));
    }

    let mut result = CheckItemResult::from_outcome(&url, &outcome);
    result.issues = robots_issues(ctx.config, &outcome.response.body);
    info!(issues = result.issues.len(), "robots policy checked");
    ctx.finish(result)
}

// Splits "Field: value" into (lowercased field, trimmed value), dropping
// comments.
fn parse_directive(line: &str) -> Option<(String, String)> {
    let line = line.split('#').next().unwrap_or("").trim();
    let (field, value) = line.split_once(':')?;
    Some((field.trim().to_ascii_lowercase(), value.trim().to_string()))
}

pub fn robots_issues(config: &AuditConfig, body: &str) -> Vec<String> {
    let present: Vec<(String, String)> = body.lines().filter_map(parse_directive).collect();
    let mut issues = Vec::new();

    for directive in &config.required_robots_directives {
        let directive = config.expand(directive);
        let found = match parse_directive(&directive) {
            Some(required) => present.contains(&required),
            None => body.lines().any(|line| line.trim() == directive),
        };
        if !found {
            issues.push(format!("Missing robots directive: {directive}"));
        }
    }

    for agent in &config.required_robots_agents {
        let found = present
            .iter()
            .any(|(field, value)| field == "user-agent" && value.eq_ignore_ascii_case(agent));
        if !found {
            issues.push(format!("Missing User-agent section: {agent}"));
        }
    }

    issues
}

pub async fn check_search_noindex(ctx: &CheckContext<'_>) -> Result<CheckItemResult, AuditError> {
    let url = ctx.config.site_url(&ctx.config.search_path);
    let outcome = match ctx.fetcher.get(&url).await {
        Ok(outcome) => outcome,
        Err(e) => {
            let result = CheckItemResult::fetch_failed(&url, &e, ctx.fetcher.max_retries());
            return ctx.finish(result);
        }
    };

    let mut result = CheckItemResult::from_outcome(&url, &outcome);
    if !outcome.response.is_success() {
        result.issues.push(format!("HTTP {}", outcome.response.status));
        return ctx.finish(result);
    }

    let (canonical, issues) = search_issues(ctx.config, &outcome.final_url, &outcome.response.body);
    result.canonical = canonical;
    result.issues = issues;
    ctx.finish(result)
}

pub fn search_issues(
    config: &AuditConfig,
    final_url: &str,
    html: &str,
) -> (Option<String>, Vec<String>) {
    let mut issues = Vec::new();

    match extract_meta_value(html, "robots", "name") {
        None => issues.push("Missing robots meta tag".to_string()),
        Some(content) => {
            let tokens: Vec<String> = content
                .split(',')
                .map(|token| token.trim().to_ascii_lowercase())
                .collect();
            if !tokens.iter().any(|t| t == "noindex") {
                issues.push(format!("Robots meta missing noindex (got {content})"));
            }
            if !tokens.iter().any(|t| t == "follow") {
                issues.push(format!("Robots meta missing follow (got {content})"));
            }
        }
    }

    let expected_raw = config.site_url(&config.search_path);
    let expected = normalize_url(&expected_raw).unwrap_or(expected_raw);
    let canonical = extract_canonical(html).and_then(|href| to_absolute_normalized(&href, final_url));
    match &canonical {
        None => issues.push("Missing canonical tag".to_string()),
        Some(canonical) if *canonical != expected => issues.push(format!(
            "Search canonical mismatch (expected {expected}, got {canonical})"
        )),
        Some(_) => {}
    }

    (canonical, issues)
}
