//! Simple operation timing helper.

use std::time::Instant;

/// Measures how long an orchestration operation took.
#[derive(Debug)]
pub struct OperationTimer {
    start: Instant,
    name: &'static str,
}

impl OperationTimer {
    /// Starts a new timer.
    #[must_use]
    pub fn start(name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            name,
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns the operation name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}
