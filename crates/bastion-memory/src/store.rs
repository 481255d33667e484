//! The `MemoryStore` contract (§4.4) and its two backends.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::MemoryResult;

/// Default page size used by [`RemoteMemoryStore`] implementations when
/// scanning for a `list` call (§4.4: "scan-based listing with 200-batch
/// cursor pagination").
pub const REMOTE_SCAN_BATCH_SIZE: usize = 200;

/// The capability surface every memory backend implements: `get`, `set`
/// (with optional TTL), `delete`, `list` (optional prefix/limit), `ttl`.
///
/// Implementations must be interchangeable: nothing above this trait may
/// depend on which backend is in use.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Fetch the current value for `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> MemoryResult<Option<String>>;

    /// Store `value` under `key`, expiring after `ttl_secs` seconds if set.
    async fn set(&self, key: &str, value: String, ttl_secs: Option<u64>) -> MemoryResult<()>;

    /// Remove `key`, if present.
    async fn delete(&self, key: &str) -> MemoryResult<()>;

    /// List keys, optionally restricted to `prefix` and capped at `limit`.
    async fn list(&self, prefix: Option<&str>, limit: Option<usize>) -> MemoryResult<Vec<String>>;

    /// Remaining seconds-to-live for `key`, `None` if it has no expiry or
    /// does not exist.
    async fn ttl(&self, key: &str) -> MemoryResult<Option<i64>>;
}

struct Entry {
    value: String,
    expires_at_millis: Option<i64>,
}

impl Entry {
    fn is_expired(&self, now_millis: i64) -> bool {
        self.expires_at_millis.is_some_and(|exp| exp <= now_millis)
    }
}

/// In-process backend: a sharded map with TTL enforced lazily on read
/// (§4.4). Suitable for single-node deployments and tests.
#[derive(Default)]
pub struct InProcessStore {
    entries: DashMap<String, Entry>,
}

impl InProcessStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoryStore for InProcessStore {
    async fn get(&self, key: &str) -> MemoryResult<Option<String>> {
        let now = bastion_core::now_millis();
        if let Some(entry) = self.entries.get(key) {
            if entry.is_expired(now) {
                drop(entry);
                self.entries.remove(key);
                return Ok(None);
            }
            return Ok(Some(entry.value.clone()));
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl_secs: Option<u64>) -> MemoryResult<()> {
        let expires_at_millis = ttl_secs.map(|secs| {
            bastion_core::now_millis().saturating_add(i64::try_from(secs).unwrap_or(i64::MAX).saturating_mul(1000))
        });
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at_millis,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> MemoryResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: Option<&str>, limit: Option<usize>) -> MemoryResult<Vec<String>> {
        let now = bastion_core::now_millis();
        let mut expired = Vec::new();
        let mut matched = BTreeMap::new();

        for item in &self.entries {
            if item.value().is_expired(now) {
                expired.push(item.key().clone());
                continue;
            }
            if prefix.map_or(true, |p| item.key().starts_with(p)) {
                matched.insert(item.key().clone(), ());
            }
        }

        for key in expired {
            self.entries.remove(&key);
        }

        let mut keys: Vec<String> = matched.into_keys().collect();
        if let Some(limit) = limit {
            keys.truncate(limit);
        }
        Ok(keys)
    }

    async fn ttl(&self, key: &str) -> MemoryResult<Option<i64>> {
        let now = bastion_core::now_millis();
        if let Some(entry) = self.entries.get(key) {
            if entry.is_expired(now) {
                return Ok(None);
            }
            return Ok(entry
                .expires_at_millis
                .map(|exp| (exp.saturating_sub(now)) / 1000));
        }
        Ok(None)
    }
}

/// The remote backend's contract (§4.4): atomic get/set plus scan-based
/// listing paginated in batches of [`REMOTE_SCAN_BATCH_SIZE`]. The actual
/// remote store is an external collaborator (spec.md §1); this crate only
/// defines the seam and a scripted test double.
#[async_trait]
pub trait RemoteMemoryStore: Send + Sync {
    /// Fetch one page of keys starting after `cursor`, honoring the
    /// backend's scan batch size. Returns the page and the next cursor, or
    /// `None` once exhausted.
    async fn scan_page(
        &self,
        prefix: Option<&str>,
        cursor: Option<String>,
    ) -> MemoryResult<(Vec<String>, Option<String>)>;
}

/// A scripted remote store backed by an in-memory map, for tests: proves
/// out the cursor-pagination contract without a real network dependency.
pub struct ScriptedRemoteStore {
    inner: Mutex<BTreeMap<String, Entry>>,
}

impl ScriptedRemoteStore {
    /// Build a scripted store from an initial key/value map, all entries
    /// without expiry.
    #[must_use]
    pub fn new(initial: BTreeMap<String, String>) -> Self {
        let entries = initial
            .into_iter()
            .map(|(k, v)| {
                (
                    k,
                    Entry {
                        value: v,
                        expires_at_millis: None,
                    },
                )
            })
            .collect();
        Self {
            inner: Mutex::new(entries),
        }
    }
}

#[async_trait]
impl MemoryStore for ScriptedRemoteStore {
    async fn get(&self, key: &str) -> MemoryResult<Option<String>> {
        Ok(self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(key)
            .map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl_secs: Option<u64>) -> MemoryResult<()> {
        let expires_at_millis = ttl_secs.map(|secs| {
            bastion_core::now_millis().saturating_add(i64::try_from(secs).unwrap_or(i64::MAX).saturating_mul(1000))
        });
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(
                key.to_string(),
                Entry {
                    value,
                    expires_at_millis,
                },
            );
        Ok(())
    }

    async fn delete(&self, key: &str) -> MemoryResult<()> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(key);
        Ok(())
    }

    async fn list(&self, prefix: Option<&str>, limit: Option<usize>) -> MemoryResult<Vec<String>> {
        let mut cursor = None;
        let mut out = Vec::new();
        loop {
            let (page, next) = self.scan_page(prefix, cursor).await?;
            out.extend(page);
            if let Some(limit) = limit {
                if out.len() >= limit {
                    out.truncate(limit);
                    break;
                }
            }
            match next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(out)
    }

    async fn ttl(&self, key: &str) -> MemoryResult<Option<i64>> {
        let now = bastion_core::now_millis();
        Ok(self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(key)
            .and_then(|e| e.expires_at_millis)
            .map(|exp| (exp.saturating_sub(now)) / 1000))
    }
}

#[async_trait]
impl RemoteMemoryStore for ScriptedRemoteStore {
    async fn scan_page(
        &self,
        prefix: Option<&str>,
        cursor: Option<String>,
    ) -> MemoryResult<(Vec<String>, Option<String>)> {
        let guard = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let matching: Vec<&String> = guard
            .keys()
            .filter(|k| prefix.map_or(true, |p| k.starts_with(p)))
            .filter(|k| cursor.as_ref().map_or(true, |c| k.as_str() > c.as_str()))
            .collect();

        let page: Vec<String> = matching
            .iter()
            .take(REMOTE_SCAN_BATCH_SIZE)
            .map(|k| (*k).clone())
            .collect();
        let next = if matching.len() > REMOTE_SCAN_BATCH_SIZE {
            page.last().cloned()
        } else {
            None
        };
        Ok((page, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_roundtrips() {
        let store = InProcessStore::new();
        store.set("a", "1".to_string(), None).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some("1".to_string()));
    }

    #[tokio::test]
    async fn delete_removes_key() {
        let store = InProcessStore::new();
        store.set("a", "1".to_string(), None).await.unwrap();
        store.delete("a").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entry_is_lazily_evicted() {
        let store = InProcessStore::new();
        store.set("a", "1".to_string(), Some(0)).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_filters_by_prefix_and_respects_limit() {
        let store = InProcessStore::new();
        store.set("profile:1", "x".to_string(), None).await.unwrap();
        store.set("profile:2", "x".to_string(), None).await.unwrap();
        store.set("other:1", "x".to_string(), None).await.unwrap();

        let all = store.list(None, None).await.unwrap();
        assert_eq!(all.len(), 3);

        let scoped = store.list(Some("profile:"), None).await.unwrap();
        assert_eq!(scoped.len(), 2);

        let limited = store.list(Some("profile:"), Some(1)).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn ttl_reports_remaining_seconds() {
        let store = InProcessStore::new();
        store.set("a", "1".to_string(), Some(60)).await.unwrap();
        let ttl = store.ttl("a").await.unwrap().unwrap();
        assert!(ttl > 0 && ttl <= 60);
    }

    #[tokio::test]
    async fn ttl_is_none_for_key_without_expiry() {
        let store = InProcessStore::new();
        store.set("a", "1".to_string(), None).await.unwrap();
        assert_eq!(store.ttl("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn scripted_remote_paginates_in_batches() {
        let mut initial = BTreeMap::new();
        for i in 0..450 {
            initial.insert(format!("k{i:04}"), "v".to_string());
        }
        let store = ScriptedRemoteStore::new(initial);
        let all = store.list(None, None).await.unwrap();
        assert_eq!(all.len(), 450);
    }
}
