//! Deadline and cancellation racing.
//!
//! # Responsibilities
//! - Race a pinned operation against a timer without consuming it
//! - Race an operation against a cancellation token
//!
//! # Design Decisions
//! - The operation is borrowed as `Pin<&mut F>`, so after the timer fires the
//!   caller decides: keep awaiting it (grace period, socket re-check) or drop it
//! - Dropping the operation is the only way to abort it; nothing is spawned

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Outcome of [`race`].
#[derive(Debug, PartialEq, Eq)]
pub enum Race<T> {
    /// The operation finished first.
    Completed(T),
    /// The timer fired first. The operation is untouched and may be resumed.
    Elapsed,
}

/// Race `operation` against a timer of length `limit`.
///
/// The operation is polled first, so one that is already complete always wins.
pub async fn race<F>(operation: Pin<&mut F>, limit: Duration) -> Race<F::Output>
where
    F: Future + ?Sized,
{
    tokio::select! {
        biased;
        output = operation => Race::Completed(output),
        _ = tokio::time::sleep(limit) => Race::Elapsed,
    }
}

/// Run `operation` unless `token` is cancelled first; `None` means cancelled.
pub async fn cancellable<F>(operation: F, token: &CancellationToken) -> Option<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => None,
        output = operation => Some(output),
    }
}
