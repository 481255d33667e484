//! The plugin orchestration pipelines (§4.8): prompt/message transforms,
//! tool and skill collection/execution, search, HTTP and socket routing,
//! and the tool-executor callback handed to the LLM driver.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod handle;
mod http;
mod pipeline;
mod registry;
mod search;
mod skills;
mod socket;
mod tool_executor;
mod tools;
mod util;

pub use error::{OrchestratorError, OrchestratorResult};
pub use handle::OrchestratorHandle;
pub use http::{PluginHttpRequest, PluginHttpResponse};
pub use pipeline::PipelineOutcome;
pub use registry::Orchestrator;
pub use skills::NamespacedSkill;
pub use tool_executor::ToolInvocationOutcome;
