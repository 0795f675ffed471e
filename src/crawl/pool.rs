// src/crawl/pool.rs
// =============================================================================
// Bounded worker pool over a slice of items.
//
// How it works:
// 1. A shared cursor points at the next unclaimed item
// 2. min(limit, items.len()) workers each loop: claim an index, run the
//    worker on that item, remember (index, result)
// 3. When every worker is done, results are placed back by index
//
// Each index is claimed exactly once (atomic fetch_add), so no two workers
// ever produce a result for the same slot and no lock is needed.
//
// Rust concepts:
// - AtomicUsize: a counter many futures can bump without a Mutex
// - Generic closures (F: Fn(&T) -> Fut): the caller decides what a "job" is
// - try_join_all: polls every worker future together and stops at the first Err
// - Lifetimes ('a): results may borrow from `items`, so they share its lifetime
// =============================================================================

use futures::future::try_join_all;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

// Runs `worker` over `items` with at most `limit` in flight.
//
// Returns results where `results[i]` belongs to `items[i]`. If any worker
// returns Err, the remaining workers are dropped and that error is returned.
pub async fn run_with_concurrency<'a, T, R, E, F, Fut>(
    items: &'a [T],
    limit: usize,
    worker: F,
) -> Result<Vec<R>, E>
where
    F: Fn(&'a T) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let worker_count = limit.max(1).min(items.len());
    debug!(items = items.len(), workers = worker_count, "starting worker pool");

    let cursor = AtomicUsize::new(0);
    // Shadow with references so each `async move` block copies a pointer
    // instead of trying to take ownership of the cursor / closure
    let cursor = &cursor;
    let worker = &worker;

    let lanes = (0..worker_count).map(|_| async move {
        let mut finished = Vec::new();
        loop {
            // fetch_add returns the old value: this worker's claimed index
            let index = cursor.fetch_add(1, Ordering::SeqCst);
            let Some(item) = items.get(index) else {
                break;
            };
            // `?` ends this worker; try_join_all then drops the others
            finished.push((index, worker(item).await?));
        }
        Ok::<_, E>(finished)
    });

    let lanes = try_join_all(lanes).await?;

    // R isn't Clone, so build the slots with map() instead of vec![None; n]
    let mut slots: Vec<Option<R>> = items.iter().map(|_| None).collect();
    for (index, result) in lanes.into_iter().flatten() {
        slots[index] = Some(result);
    }
    Ok(slots.into_iter().flatten().collect())
}
