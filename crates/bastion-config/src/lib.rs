//! Process configuration for the plugin orchestration core.
//!
//! Configuration is resolved in increasing precedence: built-in defaults, an
//! optional TOML file, then environment variables prefixed `BASTION_`.
//! Validation happens eagerly and aggregates every invalid field into one
//! error, mirroring the "collect all field-path errors" posture the plugin
//! loader uses for manifest validation.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod loader;
mod types;

pub use error::{ConfigError, ConfigResult};
pub use loader::load;
pub use types::{Config, MemoryEnvelopeKeys};
