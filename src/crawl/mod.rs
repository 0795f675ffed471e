// src/crawl/mod.rs
// =============================================================================
// This module fans per-URL work out over a fixed number of workers.
//
// Features:
// - At most `limit` subjects are in flight at once
// - Results come back in input order, not completion order
// - The first worker error (a fail-fast abort) stops every other worker
//
// Workers are futures polled on the current task, so all concurrency here is
// cooperative I/O concurrency; nothing is spawned onto other threads.
// =============================================================================

mod pool;

pub use pool::run_with_concurrency;
