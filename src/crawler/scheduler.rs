//! Chunked fan-out of work items
//!
//! This module handles:
//! - Partitioning `N` work items into consecutive chunks of a fixed size
//! - Running each chunk concurrently and joining it before the next starts
//! - Selecting the configured slice of a site's categories

use crate::site::Category;
use futures::future::join_all;
use std::future::Future;
use std::ops::Range;

/// Outcome of a chunked run
#[derive(Debug)]
pub struct ChunkRun<T, E> {
    /// Item index and outcome, in item order, for every item that was started
    pub results: Vec<(usize, Result<T, E>)>,

    /// True when a failed chunk stopped the remaining chunks from starting
    pub stopped_early: bool,
}

impl<T, E> ChunkRun<T, E> {
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.is_err()).count()
    }

    pub fn errors(&self) -> impl Iterator<Item = (usize, &E)> {
        self.results
            .iter()
            .filter_map(|(index, r)| r.as_ref().err().map(|e| (*index, e)))
    }

    /// Consumes the run, keeping the first error
    pub fn into_first_error(self) -> Option<E> {
        self.results.into_iter().find_map(|(_, r)| r.err())
    }
}

/// Splits `[0, len)` into consecutive ranges of at most `size` items
///
/// A `size` of zero is treated as one.
pub fn chunk_ranges(len: usize, size: usize) -> Vec<Range<usize>> {
    let size = size.max(1);
    (0..len)
        .step_by(size)
        .map(|start| start..(start + size).min(len))
        .collect()
}

/// Runs `len` items in chunks of `size`, one chunk at a time
///
/// All items of a chunk are polled concurrently and the whole chunk is joined
/// before the next one starts. With `stop_on_failure`, a chunk containing a
/// failed item is the last one started.
///
/// # Arguments
///
/// * `len` - Number of work items
/// * `size` - Chunk size
/// * `make` - Creates the future of the item with the given index
/// * `stop_on_failure` - Whether a failed chunk ends the run
pub async fn run_chunked<T, E, F, Fut>(
    len: usize,
    size: usize,
    mut make: F,
    stop_on_failure: bool,
) -> ChunkRun<T, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let chunks = chunk_ranges(len, size);
    let total = chunks.len();
    let mut results = Vec::with_capacity(len);

    for (number, chunk) in chunks.into_iter().enumerate() {
        tracing::trace!("Starting chunk {} of {} ({:?})", number + 1, total, chunk);

        let indices: Vec<usize> = chunk.collect();
        let outcomes = join_all(indices.iter().map(|&index| make(index))).await;

        let failed = outcomes.iter().any(Result::is_err);
        results.extend(indices.into_iter().zip(outcomes));

        if failed && stop_on_failure && number + 1 < total {
            return ChunkRun {
                results,
                stopped_early: true,
            };
        }
    }

    ChunkRun {
        results,
        stopped_early: false,
    }
}

/// Selects the inclusive slice of categories between two names
///
/// Names are matched against their first occurrence. A missing or unknown
/// start begins at the first category and a missing or unknown end stops at
/// the last; a start after the end selects nothing.
pub fn select_category_range<'a>(
    categories: &'a [Category],
    start: Option<&str>,
    end: Option<&str>,
) -> &'a [Category] {
    if categories.is_empty() {
        return categories;
    }

    let position = |name: &str| categories.iter().position(|c| c.name == name);

    let first = match start {
        Some(name) => position(name).unwrap_or_else(|| {
            tracing::warn!("Start category '{}' not found, starting from the first", name);
            0
        }),
        None => 0,
    };
    let last = match end {
        Some(name) => position(name).unwrap_or_else(|| {
            tracing::warn!("End category '{}' not found, ending at the last", name);
            categories.len() - 1
        }),
        None => categories.len() - 1,
    };

    if first > last {
        tracing::warn!(
            "Start category comes after end category, no categories selected"
        );
        return &categories[0..0];
    }
    &categories[first..=last]
}
