//! The RPC envelope (§4.1) and its length-prefixed wire framing.
//!
//! The envelope is the only shape that may cross the host/sandbox trust
//! boundary: no direct memory or native pointer can. Per Design Note §9,
//! interception and the sandbox-ready/init handshake are explicit tagged
//! variants rather than magic fields on an otherwise-generic payload.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod envelope;
mod framing;

pub use envelope::{Envelope, EnvelopeError, EnvelopeKind, WireError};
pub use framing::{FramingError, read_envelope, write_envelope};
