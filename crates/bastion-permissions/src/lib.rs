//! Permission grants (§4.2), the permission guard (§4.3), and the
//! best-effort SQL auditor.
//!
//! The guard is a stateless wrapper around a loaded manifest's grants; it
//! never performs I/O and never mutates anything. Every capability family
//! is fail-closed: an absent sub-grant or an empty pattern list denies the
//! action (§4.2).

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod grants;
mod guard;
mod matchers;
mod sql;

pub use error::PermissionError;
pub use grants::{
    ApiGrant, DbAccess, DbGrant, LlmGrant, LogGrant, MemoryGrant, NetworkGrant, Permissions,
    SkillsGrant, SocketGrant,
};
pub use guard::PermissionGuard;
pub use sql::{SqlAudit, audit_sql};
