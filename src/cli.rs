// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// There are no subcommands: one invocation verifies one site. Flags given on
// the command line are layered on top of an optional JSON config file, which
// is itself layered on top of the built-in defaults:
//
//   defaults  <-  --config file  <-  --site / --max-retries / --concurrency / --timeout-ms
// =============================================================================

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::config::AuditConfig;

#[derive(Parser, Debug)]
#[command(
    name = "site-verify",
    version = "0.1.0",
    about = "Verify a website's SEO invariants: sitemap, canonicals, redirects and crawl policy",
    long_about = "site-verify fetches a site's sitemap and checks every listed page, then verifies \
                  robots.txt, the search page, legacy redirects, host consolidation, soft 404s and \
                  removed URLs. It exits non-zero when anything is wrong, so it fits in a CI/CD pipeline."
)]
pub struct Cli {
    /// Canonical origin to verify (e.g., https://www.example.com)
    #[arg(long)]
    pub site: Option<String>,

    /// JSON config file; missing fields fall back to the built-in defaults
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the full report as JSON instead of the console summary
    #[arg(long)]
    pub json: bool,

    /// Stop at the first failing subject
    #[arg(long)]
    pub fail_fast: bool,

    /// Also write the JSON report to this file
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Retries per fetch after the first attempt
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Maximum number of per-URL checks in flight
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

impl Cli {
    /// Builds the effective config and validates it.
    pub fn build_config(&self) -> Result<AuditConfig> {
        let mut config = match &self.config {
            Some(path) => AuditConfig::load(path)?,
            None => AuditConfig::default(),
        };

        if let Some(site) = &self.site {
            config = config.with_site(site);
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }

        config.validate()?;
        Ok(config)
    }
}


// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why Option<u32> instead of a default_value_t?
//    - None means "the flag was not given", so the config file's value wins
//    - A default_value_t would always overwrite whatever the file said
//
// 2. Why PathBuf for file arguments?
//    - PathBuf is the owned version of &Path, like String is to &str
//    - Paths are not guaranteed to be valid UTF-8, so they get their own type
// -----------------------------------------------------------------------------
