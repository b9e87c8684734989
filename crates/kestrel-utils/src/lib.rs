//! # Kestrel Utilities
//!
//! Shared helpers for the Kestrel workspace.
//!
//! Currently this is the logging setup used by the CLI, built on `tracing`.
//! Library crates only emit events; binaries decide where they go.

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel, LoggingError};
pub use tracing::{debug, error, info, trace, warn};
