//! Failure isolation for subscriber cascades.
//!
//! Every subscriber write is attempted. Successes and failures are collected
//! side by side and reported together, so a caller can tell total success,
//! partial failure and total failure apart.

use crate::core::Promotion;
use crate::errors::{JoinedError, PromotionError, StoreError, WriteFailure};
use serde::{Deserialize, Serialize};

/// How a cascade ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeStatus {
    /// Every promotion was created.
    Succeeded,
    /// Some promotions were created and some were not.
    PartiallyFailed,
    /// Nothing was created.
    Failed,
}

/// Outcome of a subscriber cascade: the promotions that were created and,
/// if anything went wrong, the error.
#[derive(Debug, Default)]
pub struct CascadeResult {
    /// Promotions that were created.
    pub promotions: Vec<Promotion>,
    /// Set when the request was rejected or at least one write failed.
    pub error: Option<PromotionError>,
}

impl CascadeResult {
    /// A cascade rejected before any write was attempted.
    #[must_use]
    pub fn rejected(error: PromotionError) -> Self {
        Self {
            promotions: Vec::new(),
            error: Some(error),
        }
    }

    /// Returns how the cascade ended.
    #[must_use]
    pub fn status(&self) -> CascadeStatus {
        match (&self.error, self.promotions.is_empty()) {
            (None, _) => CascadeStatus::Succeeded,
            (Some(_), false) => CascadeStatus::PartiallyFailed,
            (Some(_), true) => CascadeStatus::Failed,
        }
    }

    /// Returns true if no error occurred.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Splits into the created promotions and the error.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Promotion>, Option<PromotionError>) {
        (self.promotions, self.error)
    }

    /// Returns the promotions if nothing failed, the error otherwise.
    ///
    /// Created promotions are dropped on error; use [`CascadeResult::into_parts`]
    /// to keep them.
    pub fn into_result(self) -> Result<Vec<Promotion>, PromotionError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.promotions),
        }
    }
}

/// Collects per-subscriber write outcomes.
#[derive(Debug, Default)]
pub struct FailureCollector {
    created: Vec<Promotion>,
    failures: Vec<WriteFailure>,
}

impl FailureCollector {
    /// Creates a collector sized for `n` writes.
    #[must_use]
    pub fn with_capacity(n: usize) -> Self {
        Self {
            created: Vec::with_capacity(n),
            failures: Vec::with_capacity(n),
        }
    }

    /// Records one write outcome.
    pub fn record(&mut self, promotion: Promotion, outcome: Result<(), StoreError>) {
        match outcome {
            Ok(()) => self.created.push(promotion),
            Err(error) => self
                .failures
                .push(WriteFailure::new(promotion.spec.stage, error)),
        }
    }

    /// Returns the number of writes attempted so far.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.created.len() + self.failures.len()
    }

    /// Returns the number of failed writes so far.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Produces the cascade result. Failures are joined into one
    /// `Internal` error.
    #[must_use]
    pub fn finish(self) -> CascadeResult {
        let error = if self.failures.is_empty() {
            None
        } else {
            Some(PromotionError::PartialFailure(JoinedError::new(self.failures)))
        };
        CascadeResult {
            promotions: self.created,
            error,
        }
    }
}
