//! Deferred handle to the orchestrator, used to break the construction
//! cycle between it and the syscall handler it must be injected into.
//!
//! Building a [`crate::Orchestrator`] requires a bridge per plugin, and
//! building each bridge requires a [`bastion_syscall::SyscallHandler`]
//! configured with an `Arc<dyn SkillInvoker>` so `skills.invoke` syscalls
//! can re-enter the skill pipeline — but the orchestrator itself does not
//! exist until every bridge has started. Construct a handle first, hand a
//! clone to the syscall handler, build the bridges and the orchestrator,
//! then [`OrchestratorHandle::set`] it once.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::OnceCell;

use bastion_core::PluginId;
use bastion_syscall::SkillInvoker;

use crate::registry::Orchestrator;

/// A clonable, fillable-once reference to the orchestrator (§4.8, §9).
#[derive(Clone, Default)]
pub struct OrchestratorHandle {
    inner: Arc<OnceCell<Orchestrator>>,
}

impl OrchestratorHandle {
    /// Create an empty handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill the handle. May only be called once; subsequent calls return
    /// the orchestrator that was passed in, unused.
    ///
    /// # Errors
    ///
    /// Returns `orchestrator` back if the handle was already filled.
    pub fn set(&self, orchestrator: Orchestrator) -> Result<(), Orchestrator> {
        self.inner.set(orchestrator).map_err(|e| e.into_inner())
    }

    /// Borrow the orchestrator, if it has been set.
    #[must_use]
    pub fn get(&self) -> Option<&Orchestrator> {
        self.inner.get()
    }
}

#[async_trait]
impl SkillInvoker for OrchestratorHandle {
    async fn invoke(&self, _caller: &PluginId, full_name: &str, args: Value) -> Result<Value, String> {
        match self.inner.get() {
            Some(orchestrator) => orchestrator.execute_skill(full_name, args).await.map_err(|e| e.to_string()),
            None => Err("orchestrator handle not yet initialized".to_string()),
        }
    }
}
