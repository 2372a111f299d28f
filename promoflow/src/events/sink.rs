//! Event sink trait and implementations.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::Level;

/// Receives orchestration events.
///
/// Sinks are told about every promotion created or failed and about every
/// finished cascade. A sink can never fail an orchestration call.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Delivers an event.
    ///
    /// # Arguments
    ///
    /// * `event_type` - The type of event (e.g., "promotion.created")
    /// * `data` - Optional event payload
    async fn emit(&self, event_type: &str, data: Option<Value>);
}

/// Discards every event. The default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event_type: &str, _data: Option<Value>) {}
}

/// Writes events to the tracing subscriber.
///
/// Failure events are always logged at `WARN`. Everything else uses the
/// configured level.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a logging sink at the given level. Levels finer than
    /// `DEBUG` are logged at `DEBUG`.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn field<'a>(data: Option<&'a Value>, key: &str) -> &'a str {
        data.and_then(|d| d.get(key))
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event_type: &str, data: Option<Value>) {
        let project = Self::field(data.as_ref(), "project");
        let stage = Self::field(data.as_ref(), "stage");
        let payload = data.as_ref().map(Value::to_string).unwrap_or_default();

        if event_type.ends_with(".failed") {
            tracing::warn!(event_type, project, stage, payload, "Event: {}", event_type);
        } else if self.level <= Level::INFO {
            // Level ordering runs from TRACE (greatest) to ERROR (least).
            tracing::info!(event_type, project, stage, payload, "Event: {}", event_type);
        } else {
            tracing::debug!(event_type, project, stage, payload, "Event: {}", event_type);
        }
    }
}

/// Keeps every event in memory, in arrival order. Useful in tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<(String, Option<Value>)>>,
}

impl CollectingEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<(String, Option<Value>)> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events whose type starts with `type_prefix`.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<(String, Option<Value>)> {
        self.events
            .read()
            .iter()
            .filter(|(t, _)| t.starts_with(type_prefix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event_type: &str, data: Option<Value>) {
        self.events.write().push((event_type.to_string(), data));
    }
}
