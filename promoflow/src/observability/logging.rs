//! `tracing-subscriber` installation for processes embedding the orchestrator.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Output format of installed log subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Installs a global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`. Returns false if a
/// global subscriber was already installed, in which case nothing changes.
pub fn init_logging(format: LogFormat, default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match format {
        LogFormat::Text => builder.try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    }
}
