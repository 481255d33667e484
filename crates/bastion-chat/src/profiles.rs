//! Named LLM profiles (§6 `profileId`): a thin registry over multiple
//! configured providers, so one deployment can expose several models
//! behind the same chat endpoint. Grounded on the same shape the example
//! gateway's provider registry uses, minus the concrete provider adapters
//! (`bastion-llm` only defines the [`LlmProvider`] seam).

use std::collections::HashMap;
use std::sync::Arc;

use bastion_llm::LlmProvider;

/// A registry of named LLM providers plus a default.
pub struct LlmProfiles {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    default_profile: String,
}

impl LlmProfiles {
    /// Build a registry with a single `"default"` profile.
    #[must_use]
    pub fn new(default: Arc<dyn LlmProvider>) -> Self {
        let mut providers = HashMap::new();
        providers.insert("default".to_string(), default);
        Self { providers, default_profile: "default".to_string() }
    }

    /// Register an additional named profile.
    #[must_use]
    pub fn with_profile(mut self, id: impl Into<String>, provider: Arc<dyn LlmProvider>) -> Self {
        self.providers.insert(id.into(), provider);
        self
    }

    /// Resolve a profile by id, falling back to the default profile when
    /// `profile_id` is `None`.
    #[must_use]
    pub fn resolve(&self, profile_id: Option<&str>) -> Option<Arc<dyn LlmProvider>> {
        let id = profile_id.unwrap_or(&self.default_profile);
        self.providers.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_llm::testing::ScriptedProvider;

    fn provider() -> Arc<dyn LlmProvider> {
        Arc::new(ScriptedProvider { final_text: "hi".to_string() })
    }

    #[test]
    fn falls_back_to_default_when_no_profile_requested() {
        let profiles = LlmProfiles::new(provider());
        assert!(profiles.resolve(None).is_some());
    }

    #[test]
    fn unknown_profile_resolves_to_none() {
        let profiles = LlmProfiles::new(provider());
        assert!(profiles.resolve(Some("ghost")).is_none());
    }

    #[test]
    fn named_profile_is_reachable() {
        let profiles = LlmProfiles::new(provider()).with_profile("fast", provider());
        assert!(profiles.resolve(Some("fast")).is_some());
    }
}
