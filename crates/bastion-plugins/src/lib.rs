//! Plugin manifest schema and directory-based loader (§3, §4.6).

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod loader;
mod manifest;

pub use error::{PluginLoadError, PluginLoadResult};
pub use loader::{load_plugins, LoadedPlugin};
pub use manifest::{Author, Manifest, MANIFEST_FILE_NAME};
