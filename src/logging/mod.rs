//! Standardized logging configuration for the execution core.
//!
//! Provides consistent `tracing` output across binaries embedding the crate.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Standard tracing filter (e.g., `info`, `trading_execution=debug`)
//! - `LOG_FORMAT`: Output format - `pretty` (default) or `compact`
//! - `LOG_TIMESTAMPS`: Timestamp format - `utc` (default) or `none`
//!
//! # Usage
//!
//! ```rust,ignore
//! use trading_execution::logging::{init_logging, LogConfig};
//!
//! init_logging(LogConfig::from_env())?;
//! ```

mod config;

pub use config::{init_logging, LogConfig, LogFormat, TimestampFormat};
