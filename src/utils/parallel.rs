//! Order-preserving maps over independent work items.

use rayon::prelude::*;

use crate::error::Result;

/// Apply `f` to every item, on the rayon thread pool when `parallel` is set.
///
/// Results come back in input order. On failure the error of the earliest
/// failing item is returned; in parallel mode every item still runs.
pub fn map_grid<T, R, F>(items: Vec<T>, parallel: bool, f: F) -> Result<Vec<R>>
where
    T: Send,
    R: Send,
    F: Fn(T) -> Result<R> + Sync + Send,
{
    if parallel {
        let results: Vec<Result<R>> = items.into_par_iter().map(f).collect();
        results.into_iter().collect()
    } else {
        items.into_iter().map(f).collect()
    }
}
