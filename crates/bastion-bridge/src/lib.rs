//! One worker bridge per sandboxed plugin (§4.7): process handshake,
//! pending hook-call table, and sys-call servicing.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod bridge;
mod error;
mod timeouts;

pub use bridge::WorkerBridge;
pub use error::BridgeError;
pub use timeouts::BridgeTimeouts;
