//! Logging and tracing setup for the plugin orchestration core.
//!
//! This crate provides:
//! - Configurable logging setup with multiple output formats
//! - A per-chat-request context for correlation across pipeline phases
//!
//! # Example
//!
//! ```rust,no_run
//! use bastion_telemetry::{LogConfig, LogFormat, setup_logging, RequestContext};
//!
//! # fn main() -> Result<(), bastion_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug").with_format(LogFormat::Pretty);
//! setup_logging(&config)?;
//!
//! let ctx = RequestContext::new("chat-driver");
//! let span = ctx.span();
//! let _guard = span.enter();
//! tracing::info!("processing request");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod context;
mod error;
mod logging;

pub use context::RequestContext;
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, setup_default_logging, setup_logging};
