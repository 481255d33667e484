//! Seam back into the orchestrator's skill pipeline (§9 redesign).
//!
//! `bastion-orchestrator` owns `collectSkills`/`executeSkill`, but a
//! plugin's sandboxed code reaches a skill through the `skills.invoke`
//! sys-call, which this crate services. Depending on the orchestrator
//! directly would make bastion-syscall depend on bastion-orchestrator while
//! bastion-orchestrator depends on bastion-syscall to build its handler —
//! a construction cycle. This trait breaks it: the orchestrator implements
//! it and hands an `Arc<dyn SkillInvoker>` to the syscall handler at
//! construction time.

use async_trait::async_trait;
use serde_json::Value;

use bastion_core::PluginId;

/// Re-enters the skill execution pipeline on behalf of a `skills.invoke`
/// sys-call. Implementations are responsible for resolving `full_name`
/// (the caller's local name, already namespace-checked by the permission
/// guard) to a registered skill and running it.
#[async_trait]
pub trait SkillInvoker: Send + Sync {
    /// Invoke the skill and return its result payload, or an error whose
    /// message is forwarded verbatim to the calling plugin.
    async fn invoke(
        &self,
        caller: &PluginId,
        full_name: &str,
        args: Value,
    ) -> Result<Value, String>;
}
