// src/fetch/mod.rs
// =============================================================================
// This module performs HTTP requests for the checks.
//
// Submodules:
// - redirects: the redirect-following fetcher with timeout + retry/backoff
//
// Every check goes through `Fetcher::fetch`, which never lets reqwest follow
// redirects on its own: each 3xx hop is recorded so checks can inspect the
// whole chain (first-hop status, number of hops, final URL).
// =============================================================================

mod redirects;

pub use redirects::{FetchError, FetchOutcome, Fetcher, RedirectHop};
