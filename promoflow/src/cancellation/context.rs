//! Per-request cancellation and deadline propagation.

use super::CancellationToken;
use crate::errors::StoreError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Carries the caller's cancellation signal and deadline into every
/// collaborator call made on its behalf.
#[derive(Debug, Clone)]
pub struct RequestContext {
    token: Arc<CancellationToken>,
    deadline: Option<Deadline>,
}

/// A deadline and the instant it was set, so an expiry reports the budget
/// it was given rather than the age of the request.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    set_at: Instant,
}

impl Deadline {
    fn budget(self) -> Duration {
        self.at.saturating_duration_since(self.set_at)
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContext {
    /// Creates a context that is never cancelled and has no deadline.
    #[must_use]
    pub fn new() -> Self {
        Self {
            token: Arc::new(CancellationToken::new()),
            deadline: None,
        }
    }

    /// Uses a caller-owned cancellation token.
    #[must_use]
    pub fn with_token(mut self, token: Arc<CancellationToken>) -> Self {
        self.token = token;
        self
    }

    /// Sets a deadline relative to now. An earlier existing deadline wins.
    /// A timeout too large to represent leaves the context unchanged.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let now = Instant::now();
        match now.checked_add(timeout) {
            Some(at) => self.apply_deadline(Deadline { at, set_at: now }),
            None => self,
        }
    }

    /// Sets an absolute deadline. An earlier existing deadline wins.
    #[must_use]
    pub fn with_deadline(self, deadline: Instant) -> Self {
        self.apply_deadline(Deadline {
            at: deadline,
            set_at: Instant::now(),
        })
    }

    fn apply_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) if existing.at <= deadline.at => existing,
            _ => deadline,
        });
        self
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn token(&self) -> &Arc<CancellationToken> {
        &self.token
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline.map(|d| d.at)
    }

    /// Returns true if the caller cancelled the request.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Fails if the request is cancelled or past its deadline.
    pub fn check(&self) -> Result<(), StoreError> {
        if self.is_cancelled() {
            return Err(self.cancelled_error());
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline.at => Err(deadline_error(deadline)),
            _ => Ok(()),
        }
    }

    /// Runs a collaborator call, abandoning it if the request is cancelled
    /// or its deadline passes first. The call is not started at all if the
    /// request is already done.
    pub async fn run<T, C, F>(&self, call: C) -> Result<T, StoreError>
    where
        C: FnOnce() -> F,
        F: Future<Output = Result<T, StoreError>>,
    {
        self.check()?;
        let call = call();
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    () = self.token.cancelled() => Err(self.cancelled_error()),
                    () = tokio::time::sleep_until(deadline.at) => Err(deadline_error(deadline)),
                    result = call => result,
                }
            }
            None => {
                tokio::select! {
                    biased;
                    () = self.token.cancelled() => Err(self.cancelled_error()),
                    result = call => result,
                }
            }
        }
    }

    fn cancelled_error(&self) -> StoreError {
        StoreError::Cancelled(
            self.token
                .reason()
                .unwrap_or_else(|| "request cancelled".to_string()),
        )
    }
}

fn deadline_error(deadline: Deadline) -> StoreError {
    StoreError::DeadlineExceeded(deadline.budget())
}
