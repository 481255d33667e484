//! The plugin memory service (§4.4): a namespaced key-value contract with
//! two interchangeable backends and an optional secure AEAD+HMAC envelope.
//!
//! Keys are already namespaced by the calling plugin's id before reaching
//! this crate (the sandbox prepends `pluginId:` to bare keys); this crate
//! itself is namespace-agnostic.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod envelope;
mod error;
mod store;

pub use envelope::{EnvelopeKeys, SecureEnvelopeStore};
pub use error::{MemoryError, MemoryResult};
pub use store::{
    InProcessStore, MemoryStore, RemoteMemoryStore, ScriptedRemoteStore, REMOTE_SCAN_BATCH_SIZE,
};
