//! The `LlmProvider` contract consumed by the chat driver and orchestrator.
//!
//! The actual model backend is an external collaborator (spec.md §1); this
//! crate defines the message/tool/streaming types and the provider seam.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod provider;
mod types;

pub use error::{LlmError, LlmResult};
pub use provider::{testing, LlmProvider, StreamBox};
pub use types::{
    LlmResponse, LlmToolDefinition, Message, MessageContent, MessageRole, StreamEvent, ToolCall,
    ToolCallResult, Usage,
};
