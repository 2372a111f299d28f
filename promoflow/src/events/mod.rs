//! Event sinks for orchestration observability.
//!
//! The orchestrator reports what it did to an [`EventSink`] in addition to
//! logging it. Event payloads are JSON objects with at least `project`,
//! `stage` and `freight` keys.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// A promotion was created.
pub const PROMOTION_CREATED: &str = "promotion.created";

/// Creating a promotion failed.
pub const PROMOTION_FAILED: &str = "promotion.failed";

/// Every write of a subscriber cascade has been attempted.
pub const CASCADE_COMPLETED: &str = "cascade.completed";
