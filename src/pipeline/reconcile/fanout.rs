//! Fan-out / fan-in over one async capability.
//!
//! All tasks are created up front and polled together on the caller's task,
//! so they overlap in time without spawning. Results come back indexed by
//! dispatch order regardless of completion order, and the first failure
//! aborts the whole join (remaining tasks are dropped).

use std::future::Future;

use futures_util::future::try_join_all;

/// Dispatch `count` independent tasks and await them jointly.
///
/// `task` receives the zero-based run index. The returned vector is in run
/// order. Any `Err` short-circuits: no partial results are returned.
pub async fn fan_out<T, E, F, Fut>(count: usize, task: F) -> Result<Vec<T>, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let pending: Vec<Fut> = (0..count).map(task).collect();
    try_join_all(pending).await
}

/// [`fan_out`] followed by a pure merge of the per-run results.
pub async fn fan_out_fold<T, R, E, F, Fut, M>(count: usize, task: F, merge: M) -> Result<R, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    M: FnOnce(Vec<T>) -> R,
{
    let results = fan_out(count, task).await?;
    Ok(merge(results))
}
