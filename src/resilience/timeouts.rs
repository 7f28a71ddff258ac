//! Per-attempt deadline.
//!
//! A timed-out attempt is dropped, which cancels whatever the wrapped
//! future was doing, and is reported back as the limit that was exceeded.

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

/// Run `fut` under an optional deadline.
///
/// Returns `Err(limit)` when the deadline elapses first.
pub async fn with_deadline<F>(fut: F, limit: Option<Duration>) -> Result<F::Output, Duration>
where
    F: Future,
{
    match limit {
        Some(limit) => timeout(limit, fut).await.map_err(|_| limit),
        None => Ok(fut.await),
    }
}
