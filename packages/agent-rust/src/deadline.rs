//! Per-call time budgets.
//!
//! A [`Deadline`] is fixed when execution starts and bounds each collaborator
//! await individually, so work already finished (notes, an assigned
//! transaction id) survives an expiry.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// An absolute instant derived from a millisecond budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
    budget_ms: u64,
}

/// The budget ran out before the bounded future finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("deadline of {budget_ms}ms elapsed")]
pub struct DeadlineElapsed {
    pub budget_ms: u64,
}

impl Deadline {
    /// A deadline `budget_ms` from now.
    #[must_use]
    pub fn after_ms(budget_ms: u64) -> Self {
        Self {
            at: Instant::now() + Duration::from_millis(budget_ms),
            budget_ms,
        }
    }

    #[must_use]
    pub fn budget_ms(self) -> u64 {
        self.budget_ms
    }

    #[must_use]
    pub fn remaining(self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }
}

/// Awaits `fut`, bounded by `deadline` when there is one.
///
/// # Errors
///
/// Returns [`DeadlineElapsed`] when the deadline passes first; `fut` is
/// dropped at that point.
pub async fn within<F: Future>(
    deadline: Option<Deadline>,
    fut: F,
) -> Result<F::Output, DeadlineElapsed> {
    match deadline {
        None => Ok(fut.await),
        Some(deadline) => tokio::time::timeout_at(deadline.at, fut)
            .await
            .map_err(|_| DeadlineElapsed {
                budget_ms: deadline.budget_ms,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn unbounded_without_deadline() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            7
        };
        assert_eq!(within(None, slow).await, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn elapses_with_budget() {
        let deadline = Deadline::after_ms(50);
        let slow = tokio::time::sleep(Duration::from_secs(5));
        assert_eq!(within(Some(deadline), slow).await, Err(DeadlineElapsed { budget_ms: 50 }));
        assert_eq!(deadline.remaining(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn budget_is_shared_across_awaits() {
        let deadline = Deadline::after_ms(100);
        let first = within(Some(deadline), tokio::time::sleep(Duration::from_millis(70))).await;
        assert!(first.is_ok());
        let second = within(Some(deadline), tokio::time::sleep(Duration::from_millis(70))).await;
        assert!(second.is_err());
    }
}
