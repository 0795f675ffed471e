// src/checks/redirects.rs
// =============================================================================
// Redirect-based checks. All of them issue HEAD requests and walk the tables
// from the config one entry at a time.
//
// - Legacy redirects: old path -> 301/308 -> new path, ending in 200/204
// - Host consolidation: every scheme/host variant ends at the canonical root
// - Soft 404s: ambiguous paths either redirect to a target or return an
//   error status
// - Removed URLs: 410 Gone, served directly with no redirect in between
// =============================================================================

use super::{AuditError, CheckContext, CheckItemResult};
use crate::config::Soft404Expectation;
use crate::extract::normalize_url;
use crate::fetch::FetchOutcome;

const PERMANENT_REDIRECTS: [u16; 2] = [301, 308];
const FINAL_OK: [u16; 2] = [200, 204];

fn normalized(url: &str) -> String {
    normalize_url(url).unwrap_or_else(|| url.to_string())
}

fn first_hop_issue(outcome: &FetchOutcome) -> Option<String> {
    let first = outcome.chain.first().map(|hop| hop.status);
    match first {
        Some(status) if PERMANENT_REDIRECTS.contains(&status) => None,
        Some(status) => Some(format!("Expected 301/308 on first hop, got {status}")),
        None => Some("Expected 301/308 on first hop, got unknown".to_string()),
    }
}

fn final_url_issue(outcome: &FetchOutcome, expected: &str) -> Option<String> {
    if normalized(&outcome.final_url) != expected {
        Some(format!(
            "Final URL mismatch (expected {expected}, got {})",
            outcome.final_url
        ))
    } else {
        None
    }
}

fn final_status_issue(outcome: &FetchOutcome) -> Option<String> {
    let status = outcome.response.status;
    if FINAL_OK.contains(&status) {
        None
    } else {
        Some(format!("Final status not 200/204 (got {status})"))
    }
}

pub fn legacy_redirect_issues(outcome: &FetchOutcome, expected: &str) -> Vec<String> {
    [
        first_hop_issue(outcome),
        final_url_issue(outcome, expected),
        final_status_issue(outcome),
    ]
    .into_iter()
    .flatten()
    .collect()
}

pub fn host_issues(outcome: &FetchOutcome, expected: &str) -> Vec<String> {
    [final_url_issue(outcome, expected), final_status_issue(outcome)]
        .into_iter()
        .flatten()
        .collect()
}

pub fn soft_404_issues(
    outcome: &FetchOutcome,
    expectation: &Soft404Expectation,
    expected_target: &str,
) -> Vec<String> {
    match expectation {
        Soft404Expectation::Redirect { .. } => [
            first_hop_issue(outcome),
            final_url_issue(outcome, expected_target),
        ]
        .into_iter()
        .flatten()
        .collect(),
        Soft404Expectation::Status { statuses, .. } => {
            let status = outcome.response.status;
            if statuses.contains(&status) {
                Vec::new()
            } else {
                let allowed: Vec<String> = statuses.iter().map(|s| s.to_string()).collect();
                vec![format!(
                    "Expected status {}, got {status}",
                    allowed.join(" or ")
                )]
            }
        }
    }
}

pub fn removed_url_issues(outcome: &FetchOutcome) -> Vec<String> {
    let mut issues = Vec::new();
    if outcome.response.status != 410 {
        issues.push(format!("Expected 410 Gone, got {}", outcome.response.status));
    }
    if outcome.chain.len() > 1 {
        issues.push("URL should return 410 directly without redirects".to_string());
    }
    issues
}

// Shared driver: HEAD the subject, evaluate, apply fail-fast.
async fn verify<F>(
    ctx: &CheckContext<'_>,
    subject: &str,
    expected: Option<String>,
    evaluate: F,
) -> Result<CheckItemResult, AuditError>
where
    F: FnOnce(&FetchOutcome) -> Vec<String>,
{
    let mut result = match ctx.fetcher.head(subject).await {
        Ok(outcome) => {
            let mut result = CheckItemResult::from_outcome(subject, &outcome);
            result.issues = evaluate(&outcome);
            result
        }
        Err(e) => CheckItemResult::fetch_failed(subject, &e, ctx.fetcher.max_retries()),
    };
    result.expected = expected;
    ctx.finish(result)
}

pub async fn check_legacy_redirects(
    ctx: &CheckContext<'_>,
) -> Result<Vec<CheckItemResult>, AuditError> {
    let mut results = Vec::new();
    for redirect in &ctx.config.legacy_redirects {
        let from = ctx.config.site_url(&redirect.from);
        let expected = normalized(&ctx.config.site_url(&redirect.to));
        let result = verify(ctx, &from, Some(expected.clone()), |outcome| {
            legacy_redirect_issues(outcome, &expected)
        })
        .await?;
        results.push(result);
    }
    Ok(results)
}

pub async fn check_host_consolidation(
    ctx: &CheckContext<'_>,
) -> Result<Vec<CheckItemResult>, AuditError> {
    let expected = normalized(&ctx.config.home_url());
    let mut results = Vec::new();
    for variant in &ctx.config.host_variants {
        let url = ctx.config.expand(variant);
        let result = verify(ctx, &url, Some(expected.clone()), |outcome| {
            host_issues(outcome, &expected)
        })
        .await?;
        results.push(result);
    }
    Ok(results)
}

pub async fn check_soft_404s(
    ctx: &CheckContext<'_>,
) -> Result<Vec<CheckItemResult>, AuditError> {
    let mut results = Vec::new();
    for expectation in &ctx.config.soft404 {
        let url = ctx.config.site_url(expectation.path());
        let (expected, target) = match expectation {
            Soft404Expectation::Redirect { target, .. } => {
                let target = normalized(&ctx.config.site_url(target));
                (Some(target.clone()), target)
            }
            Soft404Expectation::Status { statuses, .. } => {
                let allowed: Vec<String> = statuses.iter().map(|s| s.to_string()).collect();
                (Some(format!("HTTP {}", allowed.join("/"))), String::new())
            }
        };
        let result = verify(ctx, &url, expected, |outcome| {
            soft_404_issues(outcome, expectation, &target)
        })
        .await?;
        results.push(result);
    }
    Ok(results)
}

pub async fn check_removed_urls(
    ctx: &CheckContext<'_>,
) -> Result<Vec<CheckItemResult>, AuditError> {
    let mut results = Vec::new();
    for path in &ctx.config.removed_paths {
        let url = ctx.config.site_url(path);
        let result = verify(ctx, &url, Some("HTTP 410".to_string()), removed_url_issues).await?;
        results.push(result);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuditConfig, LegacyRedirect};
    use crate::fetch::Fetcher;
    use crate::testing::{Route, TestServer};

    fn config_for(server: &TestServer) -> AuditConfig {
        let mut config = AuditConfig::default().with_site(&server.base());
        config.backoff_base_ms = 1;
        config.legacy_redirects = Vec::new();
        config.host_variants = Vec::new();
        config.soft404 = Vec::new();
        config.removed_paths = Vec::new();
        config
    }

    #[tokio::test]
    async fn test_legacy_redirects() {
        let server = TestServer::start(vec![
            ("/old", Route::redirect(301, "/new")),
            ("/new", Route::html(200, "")),
            ("/temp", Route::redirect(302, "/new")),
            ("/wrong", Route::redirect(301, "/other")),
            ("/other", Route::html(200, "")),
        ])
        .await;
        let mut config = config_for(&server);
        config.legacy_redirects = [("/old", "/new"), ("/temp", "/new"), ("/wrong", "/new")]
            .iter()
            .map(|(from, to)| LegacyRedirect {
                from: from.to_string(),
                to: to.to_string(),
            })
            .collect();
        let fetcher = Fetcher::new(&config).unwrap();
        let ctx = CheckContext::new(&config, &fetcher, false);

        let results = check_legacy_redirects(&ctx).await.unwrap();
        assert_eq!(results.len(), 3);

        assert!(results[0].passed(), "{:?}", results[0].issues);
        assert_eq!(results[0].chain.len(), 2);
        assert_eq!(results[0].expected.as_deref(), Some(server.url("/new").as_str()));

        assert_eq!(results[1].issues, vec!["Expected 301/308 on first hop, got 302"]);

        assert_eq!(
            results[2].issues,
            vec![format!(
                "Final URL mismatch (expected {}, got {})",
                server.url("/new"),
                server.url("/other")
            )]
        );
    }

    #[tokio::test]
    async fn test_host_consolidation() {
        let server = TestServer::start(vec![
            ("/", Route::html(200, "home")),
            ("/index.php", Route::redirect(301, "/")),
            ("/broken", Route::redirect(301, "/missing")),
        ])
        .await;
        let mut config = config_for(&server);
        config.host_variants = vec![
            "{site}/".to_string(),
            "http://{host}/index.php".to_string(),
            "{site}/broken".to_string(),
        ];
        let fetcher = Fetcher::new(&config).unwrap();
        let ctx = CheckContext::new(&config, &fetcher, false);

        let results = check_host_consolidation(&ctx).await.unwrap();
        assert!(results[0].passed());
        assert_eq!(results[1].subject, server.url("/index.php"));
        assert!(results[1].passed());
        assert_eq!(results[2].issues.len(), 2);
        assert!(results[2].issues[1].contains("Final status not 200/204 (got 404)"));
    }

    #[tokio::test]
    async fn test_soft_404s() {
        let server = TestServer::start(vec![
            ("/index.html", Route::redirect(308, "/")),
            ("/", Route::html(200, "")),
            ("/gone", Route::html(410, "")),
            ("/soft", Route::html(200, "not really here")),
        ])
        .await;
        let mut config = config_for(&server);
        config.soft404 = vec![
            Soft404Expectation::Redirect {
                path: "/index.html".to_string(),
                target: "/".to_string(),
            },
            Soft404Expectation::Status {
                path: "/gone".to_string(),
                statuses: vec![404, 410],
            },
            Soft404Expectation::Status {
                path: "soft".to_string(),
                statuses: vec![404, 410],
            },
        ];
        let fetcher = Fetcher::new(&config).unwrap();
        let ctx = CheckContext::new(&config, &fetcher, false);

        let results = check_soft_404s(&ctx).await.unwrap();
        assert!(results[0].passed(), "{:?}", results[0].issues);
        assert!(results[1].passed());
        assert_eq!(results[2].subject, server.url("/soft"));
        assert_eq!(results[2].issues, vec!["Expected status 404 or 410, got 200"]);
    }

    #[tokio::test]
    async fn test_removed_url_must_not_redirect() {
        let server = TestServer::start(vec![
            ("/removed", Route::html(410, "")),
            ("/detour", Route::redirect(301, "/removed")),
            ("/alive", Route::html(200, "")),
        ])
        .await;
        let mut config = config_for(&server);
        config.removed_paths = vec!["/removed".into(), "/detour".into(), "/alive".into()];
        let fetcher = Fetcher::new(&config).unwrap();
        let ctx = CheckContext::new(&config, &fetcher, false);

        let results = check_removed_urls(&ctx).await.unwrap();
        assert!(results[0].passed());
        assert_eq!(results[1].status, Some(410));
        assert_eq!(
            results[1].issues,
            vec!["URL should return 410 directly without redirects"]
        );
        assert_eq!(results[2].issues, vec!["Expected 410 Gone, got 200"]);
    }

    #[tokio::test]
    async fn test_unreachable_subject_is_an_issue_not_an_abort() {
        let server = TestServer::start(vec![]).await;
        let mut config = config_for(&server);
        // Nothing listens on the discard port
        config.site = "http://127.0.0.1:9".to_string();
        config.max_retries = 1;
        config.removed_paths = vec!["/x".into()];
        let fetcher = Fetcher::new(&config).unwrap();
        let ctx = CheckContext::new(&config, &fetcher, false);

        let results = check_removed_urls(&ctx).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].issues[0].starts_with("Error: Failed after 1 retries"));
        assert!(results[0].chain.is_empty());
        assert_eq!(results[0].retries, 1);
    }

    #[tokio::test]
    async fn test_fail_fast_stops_at_first_failing_entry() {
        let server = TestServer::start(vec![("/alive", Route::html(200, ""))]).await;
        let mut config = config_for(&server);
        config.removed_paths = vec!["/alive".into(), "/never-checked".into()];
        let fetcher = Fetcher::new(&config).unwrap();
        let ctx = CheckContext::new(&config, &fetcher, true);

        let err = check_removed_urls(&ctx).await.unwrap_err();
        assert!(err.is_fail_fast());
        assert_eq!(server.hits(), 1);
    }
}
