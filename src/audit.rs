// src/audit.rs
// =============================================================================
// Runs every check against one site, in a fixed order:
//
//   sitemap -> canonical -> blog parity -> robots -> search noindex
//   -> legacy redirects -> host consolidation -> soft 404s -> removed URLs
//
// Each check's results are stored in the report as soon as the check
// finishes, so a run that aborts (fail-fast or a fatal fetch) still hands back
// everything gathered up to that point.
// =============================================================================

use std::time::Instant;
use tracing::{error, info};

use crate::checks::{
    check_blog_metadata, check_canonical_urls, check_host_consolidation, check_legacy_redirects,
    check_removed_urls, check_robots_policy, check_search_noindex, check_sitemap, check_soft_404s,
    AuditError, CheckContext,
};
use crate::config::AuditConfig;
use crate::fetch::Fetcher;
use crate::report::{CheckResults, Report};

/// How a run ended. Both variants carry a sealed report.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(Report),
    Aborted(Report),
}

impl RunOutcome {
    pub fn report(&self) -> &Report {
        match self {
            RunOutcome::Completed(report) | RunOutcome::Aborted(report) => report,
        }
    }

    pub fn into_report(self) -> Report {
        match self {
            RunOutcome::Completed(report) | RunOutcome::Aborted(report) => report,
        }
    }

    pub fn passed(&self) -> bool {
        self.report().summary.passed
    }
}

pub async fn run(config: &AuditConfig, fail_fast: bool) -> RunOutcome {
    let started = Instant::now();
    let mut report = Report::new(config, fail_fast);
    info!(site = %config.site, fail_fast, "starting verification");

    let result = match Fetcher::new(config) {
        Ok(fetcher) => {
            let ctx = CheckContext::new(config, &fetcher, fail_fast);
            run_checks(&ctx, &mut report.results).await
        }
        Err(e) => Err(AuditError::Fatal(format!("Failed to build HTTP client: {e}"))),
    };

    match result {
        Ok(()) => {
            report.finish(started.elapsed());
            info!(
                total_issues = report.summary.total_issues,
                seconds = report.summary.duration_seconds,
                "verification finished"
            );
            RunOutcome::Completed(report)
        }
        Err(e) => {
            error!(error = %e, "verification aborted");
            report.finish_aborted(started.elapsed(), &e);
            RunOutcome::Aborted(report)
        }
    }
}

async fn run_checks(ctx: &CheckContext<'_>, results: &mut CheckResults) -> Result<(), AuditError> {
    let sitemap = check_sitemap(ctx).await?;
    let sitemap_issues = sitemap.issues();
    let locs = sitemap.locs.clone();
    results.sitemap = Some(sitemap);
    ctx.ensure_clean(&ctx.config.sitemap_url(), &sitemap_issues)?;

    info!(urls = locs.len(), "canonical verification");
    results.canonical = Some(check_canonical_urls(ctx, &locs).await?);

    info!("blog metadata parity");
    results.blog_metadata_parity = Some(check_blog_metadata(ctx, &locs).await?);

    info!("robots policy");
    results.robots_policy = Some(check_robots_policy(ctx).await?);

    info!("search noindex");
    results.search_noindex = Some(check_search_noindex(ctx).await?);

    info!("legacy redirects");
    results.legacy_redirects = Some(check_legacy_redirects(ctx).await?);

    info!("host consolidation");
    results.host_consolidation = Some(check_host_consolidation(ctx).await?);

    info!("soft 404 checks");
    results.soft404 = Some(check_soft_404s(ctx).await?);

    info!("removed URLs");
    results.removed_urls = Some(check_removed_urls(ctx).await?);

    Ok(())
}
