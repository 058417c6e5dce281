//! Bounded retry of an async action whose result can be "not ready yet"
//!
//! A page may come back before the site finished rendering it (an empty body
//! or a placeholder). Such a response is not an error, so the action succeeds;
//! the predicate flags it and the action is run again after `recover`.

use std::future::Future;
use thiserror::Error;

/// Why a retried action did not produce an accepted value
#[derive(Debug, Error)]
pub enum RetryError<T, E> {
    /// The action itself failed; it is not retried
    #[error("{0}")]
    Failed(E),

    /// Every attempt produced a value the predicate rejected
    #[error("gave up after {tries} tries")]
    MaxTriesReached { tries: u32, last: T },
}

/// Runs `action` until `should_retry` rejects its value or `max_tries` is hit
///
/// `recover` runs between two attempts, never after the last one. A
/// `max_tries` of zero behaves like one.
///
/// # Returns
///
/// * `Ok(T)` - The first value `should_retry` accepted
/// * `Err(RetryError::Failed)` - The action failed
/// * `Err(RetryError::MaxTriesReached)` - No attempt produced an accepted value
pub async fn retry<T, E, A, Fut, P, R, RFut>(
    mut action: A,
    should_retry: P,
    mut recover: R,
    max_tries: u32,
) -> Result<T, RetryError<T, E>>
where
    A: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&T) -> bool,
    R: FnMut() -> RFut,
    RFut: Future<Output = ()>,
{
    let max_tries = max_tries.max(1);
    let mut tries = 0;

    loop {
        let value = action().await.map_err(RetryError::Failed)?;
        tries += 1;

        if !should_retry(&value) {
            return Ok(value);
        }
        if tries >= max_tries {
            return Err(RetryError::MaxTriesReached { tries, last: value });
        }

        tracing::debug!("Retrying, attempt {} of {}", tries + 1, max_tries);
        recover().await;
    }
}
