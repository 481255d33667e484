//! The conversational chat surface (§4.9, §6): the turn driver that glues
//! orchestrator pipelines to an LLM provider and a conversation store, the
//! SSE event stream it emits, and the HTTP routes that front it.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod driver;
mod error;
mod events;
mod http;
mod profiles;
mod state;
mod store;
mod title;

pub use driver::{ChatDriver, ChatRequest};
pub use error::ChatError;
pub use events::ChatEvent;
pub use http::router;
pub use profiles::LlmProfiles;
pub use state::AppState;
pub use store::{Conversation, ConversationStore, InMemoryConversationStore, StoredMessage};
pub use title::derive_title;
