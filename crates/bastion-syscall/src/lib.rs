//! Sys-call rate limiting and dispatch (§3, §4.5).
//!
//! Every plugin-initiated `SYS_CALL` passes through [`SyscallHandler`]:
//! first the shared [`RateLimiter`], then a [`bastion_permissions::PermissionGuard`]
//! check specific to the requested method, then the backend itself.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod handler;
mod rate_limit;
mod skill_invoker;

pub use error::{SyscallError, SyscallResult};
pub use handler::SyscallHandler;
pub use rate_limit::{RateLimiter, DEFAULT_BUDGET, DEFAULT_WINDOW_SECS};
pub use skill_invoker::SkillInvoker;
