//! Orchestrator configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors loading an [`OrchestratorConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Path that was read.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration text is not valid JSON for this type.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),

    /// The service was built without a required collaborator.
    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),
}

/// Longest accepted per-call timeout, one day.
pub const MAX_CALL_TIMEOUT_SECONDS: f64 = 86_400.0;

/// Tunables for the promotion orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum subscriber writes in flight at once during a cascade.
    #[serde(default = "default_max_concurrent_writes")]
    pub max_concurrent_writes: usize,
    /// Timeout applied to each individual collaborator call.
    #[serde(default)]
    pub call_timeout_seconds: Option<f64>,
    /// Whether to report to the configured event sink.
    #[serde(default = "default_emit_events")]
    pub emit_events: bool,
}

fn default_max_concurrent_writes() -> usize {
    8
}

fn default_emit_events() -> bool {
    true
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_writes: default_max_concurrent_writes(),
            call_timeout_seconds: None,
            emit_events: default_emit_events(),
        }
    }
}

impl OrchestratorConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Sets the fan-out concurrency.
    #[must_use]
    pub fn with_max_concurrent_writes(mut self, n: usize) -> Self {
        self.max_concurrent_writes = n;
        self
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_seconds = Some(timeout.as_secs_f64());
        self
    }

    /// Enables or disables event emission.
    #[must_use]
    pub fn with_events(mut self, enabled: bool) -> Self {
        self.emit_events = enabled;
        self
    }

    /// Returns the per-call timeout as a Duration.
    #[must_use]
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_seconds
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_writes == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_writes must be at least 1".to_string(),
            ));
        }
        if let Some(secs) = self.call_timeout_seconds {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "call_timeout_seconds must be positive, got {secs}"
                )));
            }
            if secs > MAX_CALL_TIMEOUT_SECONDS {
                return Err(ConfigError::Invalid(format!(
                    "call_timeout_seconds must be at most {MAX_CALL_TIMEOUT_SECONDS}, got {secs}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.max_concurrent_writes, 8);
        assert!(config.call_timeout().is_none());
        assert!(config.emit_events);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = OrchestratorConfig::from_json_str(r#"{"call_timeout_seconds": 2.5}"#).unwrap();
        assert_eq!(config.max_concurrent_writes, 8);
        assert_eq!(config.call_timeout(), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = OrchestratorConfig::from_json_str(r#"{"max_concurrent_writes": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_negative_timeout_rejected() {
        let err = OrchestratorConfig::from_json_str(r#"{"call_timeout_seconds": -1}"#).unwrap_err();
        assert!(err.to_string().contains("must be positive"));
    }

    #[test]
    fn test_huge_timeout_rejected() {
        for text in [
            r#"{"call_timeout_seconds": 1e30}"#,
            r#"{"call_timeout_seconds": 1e18}"#,
            r#"{"call_timeout_seconds": 86400.5}"#,
        ] {
            let err = OrchestratorConfig::from_json_str(text).unwrap_err();
            assert!(err.to_string().contains("must be at most"), "{text}: {err}");
        }

        let config = OrchestratorConfig::from_json_str(r#"{"call_timeout_seconds": 86400}"#).unwrap();
        assert_eq!(config.call_timeout(), Some(Duration::from_secs(86_400)));
    }

    #[test]
    fn test_unvalidated_huge_timeout_does_not_panic() {
        let config = OrchestratorConfig {
            call_timeout_seconds: Some(1e30),
            ..OrchestratorConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(config.call_timeout().is_none());
    }

    #[test]
    fn test_malformed_json() {
        let err = OrchestratorConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_concurrent_writes": 2, "emit_events": false}}"#).unwrap();

        let config = OrchestratorConfig::from_file(file.path()).unwrap();
        assert_eq!(
            config,
            OrchestratorConfig::new()
                .with_max_concurrent_writes(2)
                .with_events(false)
        );
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = OrchestratorConfig::from_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
