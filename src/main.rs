// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Set up logging (tracing, to stderr, filtered by RUST_LOG)
// 2. Parse command-line arguments and build the effective config
// 3. Run every check against the site
// 4. Print / persist the report
// 5. Exit with proper code (0 = everything passed, 1 = anything else)
//
// Logs never go to stdout, so `--json` output stays a single JSON document.
// =============================================================================

mod audit;    // src/audit.rs - runs the checks in order
mod checks;   // src/checks/ - the individual verifications
mod cli;      // src/cli.rs - command-line parsing
mod config;   // src/config.rs - AuditConfig and the default tables
mod crawl;    // src/crawl/ - bounded worker pool
mod extract;  // src/extract/ - HTML / sitemap / URL helpers
mod fetch;    // src/fetch/ - redirect-following HTTP fetcher
mod report;   // src/report/ - report aggregation and output

#[cfg(test)]
mod testing;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    init_logging();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ Fatal error: {:#}", e);
            1
        }
    };

    std::process::exit(exit_code);
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// Returns:
//   Ok(0) = every check passed
//   Ok(1) = issues found, fail-fast abort, or a fatal fetch
//   Err   = bad config or the report could not be written
async fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = cli.build_config()?;

    if !cli.json {
        println!("🔍 Verifying site: {}", config.site);
    }

    let outcome = audit::run(&config, cli.fail_fast).await;
    let passed = outcome.passed();
    report::emit(&outcome.into_report(), cli.json, cli.output.as_deref())?;

    Ok(if passed { 0 } else { 1 })
}
