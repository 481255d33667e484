//! The relational-store contract plugins reach via `db.*` sys-calls.
//!
//! The backend itself lives outside this core (spec.md §1 "external
//! collaborator"); this crate defines the seam and an in-memory test
//! double.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod backend;
mod error;

pub use backend::{DbBackend, InMemoryDbBackend, ItemQuery, Row};
pub use error::{DbError, DbResult};
