//! Conflict-safe read-modify-write with bounded exponential backoff.
//!
//! The store guards every update with the resource version it was read at.
//! A stale write is rejected as a conflict; the only correct response is to
//! read again, reapply the change, and try again. [`compare_and_swap`] is that
//! loop, independent of any particular store. [`mutate_with_retry`] binds it
//! to a [`Gateway`].

use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::gateway::{Gateway, GatewayError};
use super::ResourceReference;

/// Errors that can tell an optimistic-concurrency conflict apart from other failures.
pub trait ConflictAware {
    /// Returns `true` when the failure was a stale-version conflict.
    fn is_conflict(&self) -> bool;
}

/// Retry budget: number of attempts and the delay schedule between them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// Total attempts, including the first.
    pub steps: u32,
    /// Delay before the second attempt.
    pub initial: Duration,
    /// Multiplier applied to the delay after each retry.
    pub factor: f64,
    /// Upper bound for any single delay.
    pub cap: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            steps: 5,
            initial: Duration::from_millis(10),
            factor: 2.0,
            cap: Duration::from_secs(1),
        }
    }
}

impl Backoff {
    /// Delays slept between consecutive attempts; one fewer than `steps`.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let Self { steps, initial, factor, cap } = *self;
        let retries = steps.max(1) - 1;
        let mut next = initial.min(cap);
        (0..retries).map(move |_| {
            let current = next;
            next = Duration::try_from_secs_f64(next.as_secs_f64() * factor.max(1.0))
                .map_or(cap, |grown| cap.min(grown));
            current
        })
    }
}

/// Why a retried operation gave up.
#[derive(Debug, Error)]
pub enum RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// Every attempt ended in a conflict.
    #[error("retries exhausted after {attempts} conflicting attempts")]
    Exhausted {
        /// Attempts made.
        attempts: u32,
        /// The final conflict.
        #[source]
        last: E,
    },
    /// A non-conflict failure stopped the loop immediately.
    #[error(transparent)]
    Aborted(E),
}

impl<E> RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// Returns `true` when the retry budget ran out.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// The last underlying failure.
    #[must_use]
    pub fn last_error(&self) -> &E {
        match self {
            Self::Exhausted { last, .. } => last,
            Self::Aborted(err) => err,
        }
    }
}

/// Bookkeeping shared by the retry loops.
struct Attempts<I> {
    delays: I,
    made: u32,
}

impl<I: Iterator<Item = Duration>> Attempts<I> {
    fn new(delays: I) -> Self {
        Self { delays, made: 0 }
    }

    /// Records a failed attempt; sleeps and returns `Ok` when another one is allowed.
    async fn after_failure<E>(&mut self, err: E) -> Result<(), RetryError<E>>
    where
        E: ConflictAware + std::error::Error + 'static,
    {
        self.made += 1;
        if !err.is_conflict() {
            return Err(RetryError::Aborted(err));
        }
        match self.delays.next() {
            Some(delay) => {
                debug!(attempt = self.made, delay = ?delay, "conflict, retrying");
                tokio::time::sleep(delay).await;
                Ok(())
            }
            None => Err(RetryError::Exhausted { attempts: self.made, last: err }),
        }
    }
}

/// Runs `operation` until it succeeds, fails with a non-conflict error, or
/// the backoff budget is spent.
///
/// # Errors
///
/// Returns [`RetryError::Aborted`] on the first non-conflict failure and
/// [`RetryError::Exhausted`] when every attempt conflicted.
pub async fn retry_on_conflict<T, E, F, Fut>(
    backoff: &Backoff,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: ConflictAware + std::error::Error + 'static,
{
    let mut attempts = Attempts::new(backoff.delays());
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => attempts.after_failure(err).await?,
        }
    }
}

/// Fetch, transform, commit; on conflict start over from a fresh fetch.
///
/// The document produced by `fetch` is consumed by `transform`, so a stale
/// copy can never be committed twice.
///
/// # Errors
///
/// Fetch and commit failures other than conflicts abort immediately;
/// repeated conflicts end in [`RetryError::Exhausted`].
pub async fn compare_and_swap<D, T, E, Fetch, FetchFut, Transform, Commit, CommitFut>(
    backoff: &Backoff,
    mut fetch: Fetch,
    mut transform: Transform,
    mut commit: Commit,
) -> Result<T, RetryError<E>>
where
    Fetch: FnMut() -> FetchFut,
    FetchFut: Future<Output = Result<D, E>>,
    Transform: FnMut(D) -> D,
    Commit: FnMut(D) -> CommitFut,
    CommitFut: Future<Output = Result<T, E>>,
    E: ConflictAware + std::error::Error + 'static,
{
    let mut attempts = Attempts::new(backoff.delays());
    loop {
        let outcome = match fetch().await {
            Ok(current) => commit(transform(current)).await,
            Err(err) => Err(err),
        };
        match outcome {
            Ok(value) => return Ok(value),
            Err(err) => attempts.after_failure(err).await?,
        }
    }
}

/// Applies `mutate` to the latest copy of `reference` and writes it back,
/// retrying on conflict. Returns the stored document.
///
/// # Errors
///
/// Returns [`RetryError::Aborted`] when the instance is missing or the store
/// fails for a reason other than a conflict, and [`RetryError::Exhausted`]
/// when conflicts outlast the budget.
pub async fn mutate_with_retry<F>(
    gateway: Gateway<'_>,
    backoff: &Backoff,
    reference: &ResourceReference,
    mutate: F,
) -> Result<Value, RetryError<GatewayError>>
where
    F: FnMut(Value) -> Value,
{
    compare_and_swap(
        backoff,
        move || async move { gateway.fetch(reference).await },
        mutate,
        move |desired| async move { gateway.update(reference, desired).await },
    )
    .await
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use serde_json::json;

    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::ports::StoreError;

    #[derive(Debug, Error)]
    #[error("{0}")]
    struct Flaky(&'static str);

    impl ConflictAware for Flaky {
        fn is_conflict(&self) -> bool {
            self.0 == "conflict"
        }
    }

    fn quick(steps: u32) -> Backoff {
        Backoff {
            steps,
            initial: Duration::from_millis(1),
            factor: 2.0,
            cap: Duration::from_millis(4),
        }
    }

    #[test]
    fn delays_grow_and_are_capped() {
        let delays: Vec<_> = quick(6).delays().collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(1),
                Duration::from_millis(2),
                Duration::from_millis(4),
                Duration::from_millis(4),
                Duration::from_millis(4),
            ]
        );
    }

    #[test]
    fn overflowing_growth_falls_back_to_the_cap() {
        let backoff = Backoff { factor: 1e300, ..quick(4) };
        let delays: Vec<_> = backoff.delays().collect();
        assert_eq!(
            delays,
            vec![Duration::from_millis(1), Duration::from_millis(4), Duration::from_millis(4)]
        );
    }

    #[test]
    fn single_step_never_sleeps() {
        assert_eq!(quick(1).delays().count(), 0);
        assert_eq!(quick(0).delays().count(), 0);
    }

    #[tokio::test]
    async fn conflicts_are_retried_until_success() {
        let calls = Cell::new(0);
        let result = retry_on_conflict(&quick(5), || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move { if n < 3 { Err(Flaky("conflict")) } else { Ok(n) } }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn other_failures_abort_without_retry() {
        let calls = Cell::new(0);
        let result: Result<(), _> = retry_on_conflict(&quick(5), || {
            calls.set(calls.get() + 1);
            async { Err(Flaky("forbidden")) }
        })
        .await;
        assert!(matches!(result, Err(RetryError::Aborted(_))));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn exhaustion_is_distinct_from_a_plain_conflict() {
        let calls = Cell::new(0);
        let result: Result<(), _> = retry_on_conflict(&quick(3), || {
            calls.set(calls.get() + 1);
            async { Err(Flaky("conflict")) }
        })
        .await;
        let err = result.unwrap_err();
        assert!(err.is_exhausted());
        assert!(err.last_error().is_conflict());
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn compare_and_swap_refetches_after_conflict() {
        let fetches = Cell::new(0);
        let commits = Cell::new(0);
        let result = compare_and_swap(
            &quick(4),
            || {
                fetches.set(fetches.get() + 1);
                let version = fetches.get();
                async move { Ok::<_, Flaky>(version) }
            },
            |version| version * 10,
            |desired| {
                commits.set(commits.get() + 1);
                let first = commits.get() == 1;
                async move { if first { Err(Flaky("conflict")) } else { Ok(desired) } }
            },
        )
        .await;
        assert_eq!(result.unwrap(), 20);
        assert_eq!(fetches.get(), 2);
    }

    #[tokio::test]
    async fn mutate_with_retry_survives_a_concurrent_writer() {
        let store = InMemoryStore::new();
        let reference = ResourceReference::new("Bucket", "storage.example.org/v1", "b", "default");
        store.insert(&reference, json!({"spec": {"size": 1}}));
        store.conflict_next_updates(&reference, 1);

        let stored = mutate_with_retry(Gateway::new(&store), &quick(5), &reference, |mut doc| {
            doc["spec"]["size"] = json!(2);
            doc
        })
        .await
        .unwrap();

        assert_eq!(stored["spec"]["size"], 2);
        assert_eq!(store.count_calls("update"), 2);
    }

    #[tokio::test]
    async fn mutate_with_retry_aborts_when_instance_is_missing() {
        let store = InMemoryStore::new();
        let reference = ResourceReference::new("Bucket", "storage.example.org/v1", "b", "default");

        let err = mutate_with_retry(Gateway::new(&store), &quick(5), &reference, |doc| doc)
            .await
            .unwrap_err();

        assert!(matches!(err, RetryError::Aborted(ref e) if e.is_not_found()));
        assert_eq!(store.count_calls("update"), 0);
    }

    #[tokio::test]
    async fn mutate_with_retry_reports_exhaustion() {
        let store = InMemoryStore::new();
        let reference = ResourceReference::new("Bucket", "storage.example.org/v1", "b", "default");
        store.insert(&reference, json!({}));
        store.conflict_next_updates(&reference, 10);

        let err = mutate_with_retry(Gateway::new(&store), &quick(3), &reference, |doc| doc)
            .await
            .unwrap_err();

        assert!(err.is_exhausted());
        assert!(matches!(err.last_error().source, StoreError::Conflict { .. }));
    }
}
