//! Per-plugin sliding-window rate limiting (§3, §4.5).
//!
//! `300` calls per rolling `60`-second window, reset lazily on the next
//! call after the window has fully expired. Modeled on the check-and-reserve
//! pattern of a session budget tracker: one lock guards both the prune and
//! the reservation so a burst of concurrent calls cannot all observe room
//! under the limit and all be admitted.

use std::collections::VecDeque;
use std::sync::Mutex;

use dashmap::DashMap;

use bastion_core::PluginId;

/// Default rolling window, in seconds.
pub const DEFAULT_WINDOW_SECS: i64 = 60;
/// Default call budget per window.
pub const DEFAULT_BUDGET: usize = 300;

/// Tracks call timestamps per plugin and admits calls while the rolling
/// window has room.
pub struct RateLimiter {
    window_millis: i64,
    budget: usize,
    windows: DashMap<PluginId, Mutex<VecDeque<i64>>>,
}

impl RateLimiter {
    /// Build a limiter with the default window and budget (§3).
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_WINDOW_SECS, DEFAULT_BUDGET)
    }

    /// Build a limiter with an explicit window (seconds) and call budget.
    #[must_use]
    pub fn with_limits(window_secs: i64, budget: usize) -> Self {
        Self {
            window_millis: window_secs.saturating_mul(1000),
            budget,
            windows: DashMap::new(),
        }
    }

    /// Check whether `plugin_id` has room in its rolling window and, if so,
    /// reserve a slot for this call. Returns `false` when the budget is
    /// exhausted.
    #[must_use]
    pub fn check_and_reserve(&self, plugin_id: &PluginId) -> bool {
        let now = bastion_core::now_millis();
        let slot = self
            .windows
            .entry(plugin_id.clone())
            .or_insert_with(|| Mutex::new(VecDeque::new()));
        let mut calls = slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        let cutoff = now.saturating_sub(self.window_millis);
        while calls.front().is_some_and(|&t| t <= cutoff) {
            calls.pop_front();
        }

        if calls.len() >= self.budget {
            return false;
        }

        calls.push_back(now);
        true
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid() -> PluginId {
        PluginId::parse("plugin-a").unwrap()
    }

    #[test]
    fn admits_calls_under_budget() {
        let limiter = RateLimiter::with_limits(60, 3);
        let id = pid();
        assert!(limiter.check_and_reserve(&id));
        assert!(limiter.check_and_reserve(&id));
        assert!(limiter.check_and_reserve(&id));
        assert!(!limiter.check_and_reserve(&id));
    }

    #[test]
    fn tracks_plugins_independently() {
        let limiter = RateLimiter::with_limits(60, 1);
        let a = pid();
        let b = PluginId::parse("plugin-b").unwrap();
        assert!(limiter.check_and_reserve(&a));
        assert!(limiter.check_and_reserve(&b));
        assert!(!limiter.check_and_reserve(&a));
    }

    #[test]
    fn expired_entries_are_pruned_before_checking() {
        let limiter = RateLimiter::with_limits(-1, 1);
        let id = pid();
        assert!(limiter.check_and_reserve(&id));
        // window_secs negative means cutoff is in the future relative to
        // "now", so every prior entry is immediately stale.
        assert!(limiter.check_and_reserve(&id));
    }
}
