//! Shared axum application state.

use std::sync::Arc;

use bastion_orchestrator::OrchestratorHandle;

use crate::driver::ChatDriver;
use crate::profiles::LlmProfiles;
use crate::store::ConversationStore;

/// State shared across every request handler.
#[derive(Clone)]
pub struct AppState {
    /// The chat turn driver.
    pub driver: Arc<ChatDriver>,
    /// Handle to the orchestrator, for plugin HTTP route dispatch. Filled
    /// once bootstrap completes; see [`OrchestratorHandle`].
    pub orchestrator: OrchestratorHandle,
}

impl AppState {
    /// Build the shared state from an orchestrator handle, LLM profile
    /// registry, and conversation store.
    #[must_use]
    pub fn new(orchestrator: OrchestratorHandle, profiles: Arc<LlmProfiles>, store: Arc<dyn ConversationStore>) -> Self {
        let driver = Arc::new(ChatDriver::new(orchestrator.clone(), profiles, store));
        Self { driver, orchestrator }
    }
}
