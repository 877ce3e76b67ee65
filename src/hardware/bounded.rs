//! Time-bounded execution of blocking runtime calls

use std::time::Duration;

/// Outcome of a bounded blocking call
#[derive(Debug)]
pub enum Bounded<T> {
    Done(T),
    TimedOut,
    /// The blocking task panicked or was cancelled
    Aborted(String),
}

/// Run a blocking closure on the blocking pool, giving up after `limit`.
///
/// A timed-out closure keeps running on its thread; its result is dropped.
pub async fn run_bounded<T, F>(limit: Duration, f: F) -> Bounded<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(f)).await {
        Ok(Ok(value)) => Bounded::Done(value),
        Ok(Err(e)) => Bounded::Aborted(e.to_string()),
        Err(_) => Bounded::TimedOut,
    }
}
