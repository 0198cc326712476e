//! Bounded fixed-interval polling.
//!
//! The assistant run lifecycle is asynchronous on the upstream side and the
//! request has no notification channel, so the only option is to re-check the
//! run status until it settles. This module keeps that loop out of the HTTP
//! client so it can be tested without real delays.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

/// Attempt budget and re-check cadence for [`poll_until`].
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

/// Seam over the timer so tests can poll without waiting.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Why a poll loop stopped without reaching the completed state.
#[derive(Debug)]
pub enum PollError<S, E> {
    /// A status fetch itself failed.
    Fetch(E),
    /// The failure predicate matched; carries the state that tripped it.
    Rejected(S),
    /// The attempt budget ran out before the completion predicate matched.
    TimedOut,
}

/// Re-check an asynchronous job until it completes, fails, or the attempt
/// budget runs out.
///
/// Sleeps `policy.interval` before every fetch, so even a job that is already
/// done waits one interval. A state matching `is_failed` short-circuits
/// immediately; exhausting the budget without completion is [`PollError::TimedOut`].
pub async fn poll_until<S, E, F, Fut>(
    policy: PollPolicy,
    sleeper: &dyn Sleeper,
    mut fetch: F,
    mut is_complete: impl FnMut(&S) -> bool,
    mut is_failed: impl FnMut(&S) -> bool,
) -> Result<S, PollError<S, E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<S, E>>,
{
    for _ in 0..policy.max_attempts {
        sleeper.sleep(policy.interval).await;
        let state = fetch().await.map_err(PollError::Fetch)?;
        if is_failed(&state) {
            return Err(PollError::Rejected(state));
        }
        if is_complete(&state) {
            return Ok(state);
        }
    }
    Err(PollError::TimedOut)
}
