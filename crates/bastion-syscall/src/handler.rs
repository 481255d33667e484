//! Sys-call dispatch (§4.5): rate limiting, permission checks, and method
//! routing to the db/memory/network/log/skills backends.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, Level};

use bastion_core::PluginId;
use bastion_db::{DbBackend, ItemQuery};
use bastion_memory::MemoryStore;
use bastion_permissions::{audit_sql, PermissionGuard, Permissions};

use crate::error::{SyscallError, SyscallResult};
use crate::rate_limit::RateLimiter;
use crate::skill_invoker::SkillInvoker;

/// Services sys-calls made by a sandboxed plugin. Holds no per-plugin
/// state beyond the shared rate limiter; every other check is derived from
/// the caller's manifest permissions passed in on each call.
pub struct SyscallHandler {
    rate_limiter: Arc<RateLimiter>,
    db: Arc<dyn DbBackend>,
    memory: Arc<dyn MemoryStore>,
    http: reqwest::Client,
    skills: Arc<dyn SkillInvoker>,
}

impl SyscallHandler {
    /// Build a handler over the given backends.
    #[must_use]
    pub fn new(
        rate_limiter: Arc<RateLimiter>,
        db: Arc<dyn DbBackend>,
        memory: Arc<dyn MemoryStore>,
        http: reqwest::Client,
        skills: Arc<dyn SkillInvoker>,
    ) -> Self {
        Self {
            rate_limiter,
            db,
            memory,
            http,
            skills,
        }
    }

    /// Dispatch one sys-call. Checks the rate limit first, then routes by
    /// `method` name, enforcing the caller's permissions along the way.
    ///
    /// # Errors
    ///
    /// Returns [`SyscallError`] on rate limiting, permission denial,
    /// malformed payload, unknown method, or a backend failure.
    pub async fn handle(
        &self,
        plugin_id: &PluginId,
        permissions: &Permissions,
        method: &str,
        payload: Value,
    ) -> SyscallResult<Value> {
        if !self.rate_limiter.check_and_reserve(plugin_id) {
            return Err(SyscallError::RateLimited(plugin_id.clone()));
        }

        let guard = PermissionGuard::new(plugin_id.clone(), permissions);

        match method {
            "db.query" => self.db_query(&guard, payload).await,
            "db.getItems" => self.db_get_items(&guard, payload).await,
            "db.getItem" => self.db_get_item(&guard, payload).await,
            "network.fetch" => self.network_fetch(&guard, payload).await,
            "log" => self.log(&guard, payload),
            "memory.get" => self.memory_get(&guard, payload).await,
            "memory.set" => self.memory_set(&guard, payload).await,
            "memory.delete" => self.memory_delete(&guard, payload).await,
            "memory.list" => self.memory_list(&guard, payload).await,
            "memory.ttl" => self.memory_ttl(&guard, payload).await,
            "skills.invoke" => self.skills_invoke(plugin_id, &guard, payload).await,
            other => Err(SyscallError::UnknownMethod(other.to_string())),
        }
    }

    async fn db_query(&self, guard: &PermissionGuard<'_>, payload: Value) -> SyscallResult<Value> {
        #[derive(Deserialize)]
        struct Params {
            sql: String,
            #[serde(default)]
            params: Vec<Value>,
        }
        let params: Params = parse_payload("db.query", payload)?;

        let audit = audit_sql(&params.sql);
        if audit.is_multi_statement {
            return Err(SyscallError::InvalidPayload {
                method: "db.query".to_string(),
                reason: "multi-statement SQL is not permitted".to_string(),
            });
        }

        if audit.tables.is_empty() {
            if audit.is_write {
                guard.check_db_write("*")?;
            } else {
                guard.check_db_read("*")?;
            }
        } else {
            for table in &audit.tables {
                if audit.is_write {
                    guard.check_db_write(table)?;
                } else {
                    guard.check_db_read(table)?;
                }
            }
        }

        let rows = self.db.query(&params.sql, &params.params).await?;
        Ok(json!(rows))
    }

    async fn db_get_items(&self, guard: &PermissionGuard<'_>, payload: Value) -> SyscallResult<Value> {
        #[derive(Deserialize)]
        struct Params {
            table: String,
            #[serde(default)]
            filter: std::collections::HashMap<String, Value>,
            limit: Option<u64>,
            offset: Option<u64>,
        }
        let params: Params = parse_payload("db.getItems", payload)?;
        guard.check_db_read(&params.table)?;

        let query = ItemQuery {
            filter: params.filter,
            limit: params.limit,
            offset: params.offset,
        };
        let rows = self.db.get_items(&params.table, &query).await?;
        Ok(json!(rows))
    }

    async fn db_get_item(&self, guard: &PermissionGuard<'_>, payload: Value) -> SyscallResult<Value> {
        #[derive(Deserialize)]
        struct Params {
            table: String,
            id: String,
        }
        let params: Params = parse_payload("db.getItem", payload)?;
        guard.check_db_read(&params.table)?;

        let row = self.db.get_item(&params.table, &params.id).await?;
        Ok(json!(row))
    }

    async fn network_fetch(&self, guard: &PermissionGuard<'_>, payload: Value) -> SyscallResult<Value> {
        #[derive(Deserialize)]
        struct Params {
            url: String,
            #[serde(default = "default_method")]
            method: String,
            #[serde(default)]
            headers: std::collections::HashMap<String, String>,
            body: Option<String>,
        }
        fn default_method() -> String {
            "GET".to_string()
        }
        let params: Params = parse_payload("network.fetch", payload)?;
        guard.check_network(&params.url)?;

        let method = reqwest::Method::from_bytes(params.method.as_bytes())
            .map_err(|_| SyscallError::InvalidPayload {
                method: "network.fetch".to_string(),
                reason: format!("invalid HTTP method {}", params.method),
            })?;

        let mut request = self.http.request(method, &params.url);
        for (name, value) in &params.headers {
            request = request.header(name, value);
        }
        if let Some(body) = params.body {
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SyscallError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let headers: std::collections::HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| SyscallError::Network(e.to_string()))?;

        Ok(json!({ "status": status, "headers": headers, "body": body }))
    }

    fn log(&self, guard: &PermissionGuard<'_>, payload: Value) -> SyscallResult<Value> {
        #[derive(Deserialize)]
        struct Params {
            level: String,
            message: String,
        }
        let params: Params = parse_payload("log", payload)?;

        // §4.5: a disallowed log call is silently dropped, never raises.
        if guard.can_log(&params.level) {
            let level = params
                .level
                .parse::<Level>()
                .unwrap_or(Level::INFO);
            match level {
                Level::ERROR => tracing::error!(message = %params.message, "plugin log"),
                Level::WARN => tracing::warn!(message = %params.message, "plugin log"),
                Level::DEBUG => tracing::debug!(message = %params.message, "plugin log"),
                Level::TRACE => tracing::trace!(message = %params.message, "plugin log"),
                Level::INFO => info!(message = %params.message, "plugin log"),
            }
        }
        Ok(Value::Null)
    }

    async fn memory_get(&self, guard: &PermissionGuard<'_>, payload: Value) -> SyscallResult<Value> {
        #[derive(Deserialize)]
        struct Params {
            key: String,
        }
        let params: Params = parse_payload("memory.get", payload)?;
        guard.check_memory_read(&params.key)?;
        let value = self.memory.get(&params.key).await?;
        Ok(json!(value))
    }

    async fn memory_set(&self, guard: &PermissionGuard<'_>, payload: Value) -> SyscallResult<Value> {
        #[derive(Deserialize)]
        struct Params {
            key: String,
            value: String,
            ttl: Option<u64>,
        }
        let params: Params = parse_payload("memory.set", payload)?;
        guard.check_memory_write(&params.key)?;
        self.memory.set(&params.key, params.value, params.ttl).await?;
        Ok(Value::Null)
    }

    async fn memory_delete(&self, guard: &PermissionGuard<'_>, payload: Value) -> SyscallResult<Value> {
        #[derive(Deserialize)]
        struct Params {
            key: String,
        }
        let params: Params = parse_payload("memory.delete", payload)?;
        guard.check_memory_write(&params.key)?;
        self.memory.delete(&params.key).await?;
        Ok(Value::Null)
    }

    async fn memory_list(&self, guard: &PermissionGuard<'_>, payload: Value) -> SyscallResult<Value> {
        #[derive(Deserialize)]
        struct Params {
            prefix: Option<String>,
            limit: Option<usize>,
        }
        let params: Params = parse_payload("memory.list", payload)?;
        let prefix = params.prefix.clone().unwrap_or_default();
        guard.check_memory_read(&prefix)?;
        let keys = self
            .memory
            .list(params.prefix.as_deref(), params.limit)
            .await?;
        Ok(json!(keys))
    }

    async fn memory_ttl(&self, guard: &PermissionGuard<'_>, payload: Value) -> SyscallResult<Value> {
        #[derive(Deserialize)]
        struct Params {
            key: String,
        }
        let params: Params = parse_payload("memory.ttl", payload)?;
        guard.check_memory_read(&params.key)?;
        let ttl = self.memory.ttl(&params.key).await?;
        Ok(json!(ttl))
    }

    async fn skills_invoke(
        &self,
        caller: &PluginId,
        guard: &PermissionGuard<'_>,
        payload: Value,
    ) -> SyscallResult<Value> {
        #[derive(Deserialize)]
        struct Params {
            #[serde(rename = "skillName")]
            skill_name: String,
            #[serde(default)]
            args: Value,
        }
        let params: Params = parse_payload("skills.invoke", payload)?;
        guard.check_skill(&params.skill_name)?;

        self.skills
            .invoke(caller, &params.skill_name, params.args)
            .await
            .map_err(SyscallError::Skill)
    }
}

fn parse_payload<T: for<'de> Deserialize<'de>>(method: &str, payload: Value) -> SyscallResult<T> {
    serde_json::from_value(payload).map_err(|e| SyscallError::InvalidPayload {
        method: method.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bastion_db::InMemoryDbBackend;
    use bastion_memory::InProcessStore;
    use bastion_permissions::{DbAccess, DbGrant, MemoryGrant};
    use std::collections::HashMap as Map;

    struct EchoSkills;

    #[async_trait]
    impl SkillInvoker for EchoSkills {
        async fn invoke(&self, _caller: &PluginId, full_name: &str, args: Value) -> Result<Value, String> {
            if full_name == "boom" {
                return Err("skill exploded".to_string());
            }
            Ok(json!({ "skill": full_name, "args": args }))
        }
    }

    fn handler() -> SyscallHandler {
        SyscallHandler::new(
            Arc::new(RateLimiter::with_limits(60, 300)),
            Arc::new(InMemoryDbBackend::new()),
            Arc::new(InProcessStore::new()),
            reqwest::Client::new(),
            Arc::new(EchoSkills),
        )
    }

    fn pid() -> PluginId {
        PluginId::parse("plugin-a").unwrap()
    }

    #[tokio::test]
    async fn unknown_method_is_rejected() {
        let h = handler();
        let err = h
            .handle(&pid(), &Permissions::default(), "bogus.method", Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, SyscallError::UnknownMethod(_)));
        assert_eq!(err.code(), "UNKNOWN_SYSCALL");
    }

    #[tokio::test]
    async fn rate_limit_exceeded_raises_before_dispatch() {
        let h = SyscallHandler::new(
            Arc::new(RateLimiter::with_limits(60, 1)),
            Arc::new(InMemoryDbBackend::new()),
            Arc::new(InProcessStore::new()),
            reqwest::Client::new(),
            Arc::new(EchoSkills),
        );
        let perms = Permissions::default();
        h.handle(&pid(), &perms, "bogus", Value::Null).await.ok();
        let err = h
            .handle(&pid(), &perms, "bogus", Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, SyscallError::RateLimited(_)));
    }

    #[tokio::test]
    async fn memory_roundtrip_respects_write_then_read_grants() {
        let h = handler();
        let perms = Permissions {
            memory: Some(MemoryGrant {
                read: vec!["profile:*".to_string()],
                write: vec!["profile:*".to_string()],
            }),
            ..Default::default()
        };

        let set_result = h
            .handle(
                &pid(),
                &perms,
                "memory.set",
                json!({ "key": "profile:1", "value": "hi" }),
            )
            .await;
        assert!(set_result.is_ok());

        let got = h
            .handle(&pid(), &perms, "memory.get", json!({ "key": "profile:1" }))
            .await
            .unwrap();
        assert_eq!(got, json!("hi"));

        let denied = h
            .handle(&pid(), &perms, "memory.get", json!({ "key": "other:1" }))
            .await
            .unwrap_err();
        assert!(matches!(denied, SyscallError::Permission(_)));
    }

    #[tokio::test]
    async fn db_get_item_requires_table_grant() {
        let db = Arc::new(InMemoryDbBackend::new());
        db.seed("items", "1", Map::from([("name".to_string(), json!("widget"))]));
        let h = SyscallHandler::new(
            Arc::new(RateLimiter::with_limits(60, 300)),
            db,
            Arc::new(InProcessStore::new()),
            reqwest::Client::new(),
            Arc::new(EchoSkills),
        );

        let perms = Permissions {
            db: Some(DbGrant {
                tables: vec!["items".to_string()],
                access: DbAccess::ReadOnly,
                privileged: false,
            }),
            ..Default::default()
        };

        let row = h
            .handle(&pid(), &perms, "db.getItem", json!({ "table": "items", "id": "1" }))
            .await
            .unwrap();
        assert_eq!(row, json!({ "name": "widget" }));

        let denied = h
            .handle(&pid(), &perms, "db.getItem", json!({ "table": "orders", "id": "1" }))
            .await
            .unwrap_err();
        assert!(matches!(denied, SyscallError::Permission(_)));
    }

    #[tokio::test]
    async fn skills_invoke_checks_grant_and_forwards_errors() {
        let h = handler();
        let perms = Permissions {
            skills: Some(bastion_permissions::SkillsGrant(vec!["search".to_string(), "boom".to_string()])),
            ..Default::default()
        };

        let ok = h
            .handle(
                &pid(),
                &perms,
                "skills.invoke",
                json!({ "skillName": "search", "args": {"q": "rust"} }),
            )
            .await
            .unwrap();
        assert_eq!(ok["skill"], json!("search"));

        let denied = h
            .handle(&pid(), &perms, "skills.invoke", json!({ "skillName": "other" }))
            .await
            .unwrap_err();
        assert!(matches!(denied, SyscallError::Permission(_)));

        let forwarded = h
            .handle(&pid(), &perms, "skills.invoke", json!({ "skillName": "boom" }))
            .await
            .unwrap_err();
        assert!(matches!(forwarded, SyscallError::Skill(ref msg) if msg == "skill exploded"));
    }

    #[test]
    fn log_is_silently_dropped_without_grant() {
        let h = handler();
        let guard = PermissionGuard::new(pid(), &Permissions::default());
        let result = h.log(&guard, json!({ "level": "info", "message": "hi" }));
        assert!(result.is_ok());
    }
}
