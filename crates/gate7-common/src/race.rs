//! Timeout utilities.
//!
//! [`first_to_settle`] races a future against a timer. Whichever finishes
//! first decides the outcome; when the timer wins the future is dropped, so a
//! late result can never be observed by the caller.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::trace;

use crate::Gate7Error;

/// Outcome of racing a future against a timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled<T> {
    /// The future finished before the timer.
    Completed(T),
    /// The timer fired first.
    TimedOut(Duration),
}

impl<T> Settled<T> {
    /// Convert into a `Result`, mapping a timeout to [`Gate7Error::Timeout`].
    pub fn into_result(self) -> Result<T, Gate7Error> {
        match self {
            Settled::Completed(value) => Ok(value),
            Settled::TimedOut(limit) => Err(Gate7Error::Timeout(limit)),
        }
    }

    /// Whether the timer won.
    pub fn timed_out(&self) -> bool {
        matches!(self, Settled::TimedOut(_))
    }
}

/// Race `future` against a timer of `limit`.
///
/// Ties go to the future.
pub async fn first_to_settle<F>(limit: Duration, future: F) -> Settled<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        value = future => Settled::Completed(value),
        _ = sleep(limit) => {
            trace!(?limit, "Timer settled first");
            Settled::TimedOut(limit)
        }
    }
}

/// Run an operation with a timeout.
pub async fn with_timeout<T, F, Fut>(timeout: Duration, operation: F) -> Result<T, Gate7Error>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    first_to_settle(timeout, operation()).await.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_future_wins() {
        let settled = first_to_settle(Duration::from_millis(3000), async {
            sleep(Duration::from_millis(100)).await;
            42
        })
        .await;

        assert_eq!(settled, Settled::Completed(42));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_wins() {
        let settled = first_to_settle(Duration::from_millis(3000), async {
            sleep(Duration::from_millis(5000)).await;
            42
        })
        .await;

        assert!(settled.timed_out());
        assert!(matches!(
            settled.into_result(),
            Err(Gate7Error::Timeout(d)) if d == Duration::from_millis(3000)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_loser_is_dropped() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();

        let settled = first_to_settle(Duration::from_millis(10), async move {
            sleep(Duration::from_secs(1)).await;
            flag.store(true, Ordering::SeqCst);
        })
        .await;
        assert!(settled.timed_out());

        // Even after the original deadline passes the body never runs.
        sleep(Duration::from_secs(2)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_future_beats_zero_timer() {
        let settled = first_to_settle(Duration::ZERO, async { "ready" }).await;
        assert_eq!(settled, Settled::Completed("ready"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout() {
        let result = with_timeout(Duration::from_millis(10), || async {
            sleep(Duration::from_secs(1)).await;
            42
        })
        .await;
        assert!(matches!(result, Err(Gate7Error::Timeout(_))));

        let result = with_timeout(Duration::from_secs(1), || async { 7 }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
