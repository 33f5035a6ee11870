//! Logging utilities.
//!
//! Centralizes logger initialization over the standard `log` facade. Asset
//! failures and fallback-texture diagnostics are reported through this.

mod init;

pub use init::{init_logging, LoggingConfig};
