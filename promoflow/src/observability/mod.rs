//! Logging setup and timing helpers.

mod logging;
mod timer;

pub use logging::{init_logging, LogFormat};
pub use timer::OperationTimer;
