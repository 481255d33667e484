use bastion_core::PluginId;

use crate::error::PermissionError;
use crate::grants::{DbAccess, Permissions};
use crate::matchers::{domain_matches, key_pattern_matches, skill_matches};

/// Stateless wrapper around a loaded manifest's grants (§4.3). Performs no
/// I/O; every check is a pure predicate over `Permissions`.
#[derive(Debug, Clone)]
pub struct PermissionGuard<'a> {
    plugin_id: PluginId,
    permissions: &'a Permissions,
}

impl<'a> PermissionGuard<'a> {
    /// Build a guard for `plugin_id` over `permissions`.
    #[must_use]
    pub fn new(plugin_id: PluginId, permissions: &'a Permissions) -> Self {
        Self {
            plugin_id,
            permissions,
        }
    }

    fn deny(&self, path: &str, action: impl Into<String>) -> PermissionError {
        PermissionError::new(self.plugin_id.clone(), path, action)
    }

    /// Check read access to `table`. `table == "*"` (from the SQL
    /// auditor's "no table extracted" case) is checked against the grant's
    /// wildcard rule.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError`] if the table is not in the allow-list.
    pub fn check_db_read(&self, table: &str) -> Result<(), PermissionError> {
        self.check_db_table(table, format!("read table {table}"))
    }

    /// Check write access to `table`: requires both table allow-list
    /// membership and `access = read-write`.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError`] if the table is not allowed or the grant
    /// is read-only.
    pub fn check_db_write(&self, table: &str) -> Result<(), PermissionError> {
        let grant = self
            .permissions
            .db
            .as_ref()
            .ok_or_else(|| self.deny("db", format!("write table {table}")))?;
        if grant.access != DbAccess::ReadWrite {
            return Err(self.deny("db.access", format!("write table {table} (read-only grant)")));
        }
        self.check_db_table(table, format!("write table {table}"))
    }

    fn check_db_table(&self, table: &str, action: String) -> Result<(), PermissionError> {
        let grant = self
            .permissions
            .db
            .as_ref()
            .ok_or_else(|| self.deny("db", action.clone()))?;

        let wildcard_requested = table == "*";
        let allowed = grant.tables.iter().any(|entry| {
            if entry == "*" {
                grant.privileged
            } else {
                entry == table
            }
        }) || (wildcard_requested && grant.privileged && grant.tables.iter().any(|e| e == "*"));

        if allowed {
            Ok(())
        } else {
            Err(self.deny("db.tables", action))
        }
    }

    /// Check that `url` targets a permitted host.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError`] if the grant is absent, the URL cannot
    /// be parsed, or no configured domain pattern matches the host.
    pub fn check_network(&self, url: &str) -> Result<(), PermissionError> {
        let grant = self
            .permissions
            .network
            .as_ref()
            .ok_or_else(|| self.deny("network", format!("fetch {url}")))?;

        if grant.allow_all {
            return Ok(());
        }

        let parsed = url::Url::parse(url)
            .map_err(|_| self.deny("network", format!("fetch malformed url {url}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| self.deny("network", format!("fetch url without host {url}")))?;

        if grant
            .allowed_domains
            .iter()
            .any(|entry| domain_matches(entry, host))
        {
            Ok(())
        } else {
            Err(self.deny("network.allowed_domains", format!("fetch {url}")))
        }
    }

    /// Check read access to a memory key.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError`] if no `memory.read` pattern matches.
    pub fn check_memory_read(&self, key: &str) -> Result<(), PermissionError> {
        let grant = self
            .permissions
            .memory
            .as_ref()
            .ok_or_else(|| self.deny("memory", format!("read key {key}")))?;
        if grant.read.iter().any(|p| key_pattern_matches(p, key)) {
            Ok(())
        } else {
            Err(self.deny("memory.read", format!("read key {key}")))
        }
    }

    /// Check write access to a memory key.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError`] if no `memory.write` pattern matches.
    pub fn check_memory_write(&self, key: &str) -> Result<(), PermissionError> {
        let grant = self
            .permissions
            .memory
            .as_ref()
            .ok_or_else(|| self.deny("memory", format!("write key {key}")))?;
        if grant.write.iter().any(|p| key_pattern_matches(p, key)) {
            Ok(())
        } else {
            Err(self.deny("memory.write", format!("write key {key}")))
        }
    }

    /// Check that `full_name` (possibly `pluginId__localName`) is permitted
    /// by the `skills` grant.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError`] if no grant entry matches.
    pub fn check_skill(&self, full_name: &str) -> Result<(), PermissionError> {
        let grant = self
            .permissions
            .skills
            .as_ref()
            .ok_or_else(|| self.deny("skills", format!("invoke {full_name}")))?;
        if skill_matches(&grant.0, full_name) {
            Ok(())
        } else {
            Err(self.deny("skills", format!("invoke {full_name}")))
        }
    }

    /// Check that `event` is permitted by the `socket.events` grant and
    /// that the plugin holds `socket.can_intercept` (§4.2: a plugin may be
    /// subscribed to an event without being allowed to intercept/replace
    /// it).
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError`] if `can_intercept` is unset or no event
    /// pattern matches.
    pub fn check_socket_event(&self, event: &str) -> Result<(), PermissionError> {
        let grant = self
            .permissions
            .socket
            .as_ref()
            .ok_or_else(|| self.deny("socket", format!("event {event}")))?;
        if !grant.can_intercept {
            return Err(self.deny("socket.can_intercept", format!("event {event}")));
        }
        if grant.events.iter().any(|p| key_pattern_matches(p, event)) {
            Ok(())
        } else {
            Err(self.deny("socket.events", format!("event {event}")))
        }
    }

    /// Whether the `socket.can_emit` flag is set (§4.2: gates connect/
    /// disconnect fan-out, distinct from interception).
    #[must_use]
    pub fn can_emit_socket(&self) -> bool {
        self.permissions
            .socket
            .as_ref()
            .is_some_and(|g| g.can_emit)
    }

    /// Check an `api` route grant against `method` and `path` (§4.3 "API
    /// route"). Path is normalized by stripping a single trailing slash
    /// (except for the root path) before comparison.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError`] if no route spec matches, or a matching
    /// spec's verb list excludes `method`.
    pub fn check_api_route(&self, method: &str, path: &str) -> Result<(), PermissionError> {
        let grant = self
            .permissions
            .api
            .as_ref()
            .ok_or_else(|| self.deny("api", format!("{method} {path}")))?;

        let normalized_path = normalize_trailing_slash(path);

        for spec in &grant.routes {
            let (verbs, pattern) = parse_route_spec(spec);
            let pattern = normalize_trailing_slash(&pattern);

            let matches = if let Some(prefix) = pattern.strip_suffix("/*") {
                normalized_path == prefix || normalized_path.starts_with(&format!("{prefix}/"))
            } else {
                normalized_path == pattern
            };

            if !matches {
                continue;
            }

            let verb_ok = if !verbs.is_empty() {
                verbs.iter().any(|v| v.eq_ignore_ascii_case(method))
            } else if !grant.methods.is_empty() {
                grant.methods.iter().any(|v| v.eq_ignore_ascii_case(method))
            } else {
                true
            };

            if verb_ok {
                return Ok(());
            }
        }

        Err(self.deny("api.routes", format!("{method} {path}")))
    }

    /// Whether the `llm.can_modify_prompt` flag is set.
    #[must_use]
    pub fn can_modify_prompt(&self) -> bool {
        self.permissions
            .llm
            .as_ref()
            .is_some_and(|g| g.can_modify_prompt)
    }

    /// Whether the `llm.can_modify_system_message` flag is set.
    #[must_use]
    pub fn can_modify_system_message(&self) -> bool {
        self.permissions
            .llm
            .as_ref()
            .is_some_and(|g| g.can_modify_system_message)
    }

    /// Whether the `llm.can_intercept_task` flag is set.
    #[must_use]
    pub fn can_intercept_task(&self) -> bool {
        self.permissions
            .llm
            .as_ref()
            .is_some_and(|g| g.can_intercept_task)
    }

    /// Whether the `llm.can_modify_response` flag is set (§9: required for
    /// `afterLLMCall`).
    #[must_use]
    pub fn can_modify_response(&self) -> bool {
        self.permissions
            .llm
            .as_ref()
            .is_some_and(|g| g.can_modify_response)
    }

    /// Whether logging at `level` is permitted. Never raises: the handler
    /// simply drops disallowed log calls (§4.5: "`log` ... never raises").
    #[must_use]
    pub fn can_log(&self, level: &str) -> bool {
        self.permissions.log.as_ref().is_some_and(|grant| {
            grant.enabled && grant.levels.iter().any(|l| l.eq_ignore_ascii_case(level))
        })
    }
}

fn normalize_trailing_slash(path: &str) -> String {
    if path.len() > 1 && path.ends_with('/') {
        path.trim_end_matches('/').to_string()
    } else {
        path.to_string()
    }
}

fn parse_route_spec(spec: &str) -> (Vec<String>, String) {
    let spec = spec.trim();
    if let Some((verbs_part, pattern)) = spec.split_once(' ') {
        let verbs: Vec<String> = verbs_part
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_uppercase)
            .collect();
        if !verbs.is_empty() {
            return (verbs, pattern.trim().to_string());
        }
    }
    (Vec::new(), spec.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grants::{ApiGrant, DbGrant, LlmGrant, MemoryGrant, NetworkGrant, SkillsGrant, SocketGrant};

    fn pid(s: &str) -> PluginId {
        PluginId::parse(s).unwrap()
    }

    #[test]
    fn db_read_allows_listed_table() {
        let perms = Permissions {
            db: Some(DbGrant {
                tables: vec!["items".to_string()],
                access: DbAccess::ReadOnly,
                privileged: false,
            }),
            ..Default::default()
        };
        let guard = PermissionGuard::new(pid("plugin-a"), &perms);
        assert!(guard.check_db_read("items").is_ok());
        assert!(guard.check_db_read("orders").is_err());
    }

    #[test]
    fn db_write_requires_read_write_access() {
        let perms = Permissions {
            db: Some(DbGrant {
                tables: vec!["items".to_string()],
                access: DbAccess::ReadOnly,
                privileged: false,
            }),
            ..Default::default()
        };
        let guard = PermissionGuard::new(pid("plugin-a"), &perms);
        assert!(guard.check_db_write("items").is_err());
    }

    #[test]
    fn db_wildcard_requires_privileged() {
        let unprivileged = Permissions {
            db: Some(DbGrant {
                tables: vec!["*".to_string()],
                access: DbAccess::ReadWrite,
                privileged: false,
            }),
            ..Default::default()
        };
        let guard = PermissionGuard::new(pid("plugin-a"), &unprivileged);
        assert!(guard.check_db_read("anything").is_err());

        let privileged = Permissions {
            db: Some(DbGrant {
                tables: vec!["*".to_string()],
                access: DbAccess::ReadWrite,
                privileged: true,
            }),
            ..Default::default()
        };
        let guard = PermissionGuard::new(pid("plugin-a"), &privileged);
        assert!(guard.check_db_read("anything").is_ok());
    }

    #[test]
    fn network_allow_all_short_circuits() {
        let perms = Permissions {
            network: Some(NetworkGrant {
                allowed_domains: vec![],
                allow_all: true,
            }),
            ..Default::default()
        };
        let guard = PermissionGuard::new(pid("plugin-a"), &perms);
        assert!(guard.check_network("https://anything.example/x").is_ok());
    }

    #[test]
    fn network_checks_suffix_domain() {
        let perms = Permissions {
            network: Some(NetworkGrant {
                allowed_domains: vec!["*.example.com".to_string()],
                allow_all: false,
            }),
            ..Default::default()
        };
        let guard = PermissionGuard::new(pid("plugin-a"), &perms);
        assert!(guard.check_network("https://api.example.com/x").is_ok());
        assert!(guard.check_network("https://evil.com/x").is_err());
    }

    #[test]
    fn memory_namespace_scenario_from_spec() {
        let perms = Permissions {
            memory: Some(MemoryGrant {
                read: vec!["profile:*".to_string()],
                write: vec!["profile:*".to_string()],
            }),
            ..Default::default()
        };
        let guard = PermissionGuard::new(pid("plugin-e"), &perms);
        assert!(guard.check_memory_write("profile:42").is_ok());
        assert!(guard.check_memory_read("profile:42").is_ok());
        assert!(guard.check_memory_read("other:1").is_err());
    }

    #[test]
    fn skill_grant_checks_namespace() {
        let perms = Permissions {
            skills: Some(SkillsGrant(vec!["search".to_string()])),
            ..Default::default()
        };
        let guard = PermissionGuard::new(pid("plugin-c"), &perms);
        assert!(guard.check_skill("plugin-c__search").is_ok());
        assert!(guard.check_skill("plugin-c__other").is_err());
    }

    #[test]
    fn api_route_exact_match() {
        let perms = Permissions {
            api: Some(ApiGrant {
                routes: vec!["GET /status".to_string()],
                methods: vec![],
            }),
            ..Default::default()
        };
        let guard = PermissionGuard::new(pid("plugin-d"), &perms);
        assert!(guard.check_api_route("GET", "/status").is_ok());
        assert!(guard.check_api_route("GET", "/status/").is_ok());
        assert!(guard.check_api_route("POST", "/status").is_err());
    }

    #[test]
    fn api_route_prefix_wildcard() {
        let perms = Permissions {
            api: Some(ApiGrant {
                routes: vec!["/webhooks/*".to_string()],
                methods: vec!["POST".to_string()],
            }),
            ..Default::default()
        };
        let guard = PermissionGuard::new(pid("plugin-d"), &perms);
        assert!(guard.check_api_route("POST", "/webhooks/stripe").is_ok());
        assert!(guard.check_api_route("GET", "/webhooks/stripe").is_err());
        assert!(guard.check_api_route("POST", "/other").is_err());
    }

    #[test]
    fn llm_flags_default_false_without_grant() {
        let perms = Permissions::default();
        let guard = PermissionGuard::new(pid("plugin-a"), &perms);
        assert!(!guard.can_modify_prompt());
        assert!(!guard.can_modify_response());
    }

    #[test]
    fn llm_flags_reflect_grant() {
        let perms = Permissions {
            llm: Some(LlmGrant {
                can_modify_response: true,
                ..Default::default()
            }),
            ..Default::default()
        };
        let guard = PermissionGuard::new(pid("plugin-a"), &perms);
        assert!(guard.can_modify_response());
        assert!(!guard.can_modify_prompt());
    }

    #[test]
    fn socket_event_requires_can_intercept_even_with_matching_event() {
        let perms = Permissions {
            socket: Some(SocketGrant {
                can_intercept: false,
                can_emit: false,
                events: vec!["chat.message".to_string()],
            }),
            ..Default::default()
        };
        let guard = PermissionGuard::new(pid("plugin-e"), &perms);
        assert!(guard.check_socket_event("chat.message").is_err());
    }

    #[test]
    fn socket_event_allowed_with_can_intercept_and_matching_event() {
        let perms = Permissions {
            socket: Some(SocketGrant {
                can_intercept: true,
                can_emit: false,
                events: vec!["chat.*".to_string()],
            }),
            ..Default::default()
        };
        let guard = PermissionGuard::new(pid("plugin-e"), &perms);
        assert!(guard.check_socket_event("chat.message").is_ok());
        assert!(guard.check_socket_event("presence.update").is_err());
    }

    #[test]
    fn can_emit_socket_reflects_grant() {
        let perms = Permissions {
            socket: Some(SocketGrant {
                can_intercept: false,
                can_emit: true,
                events: vec![],
            }),
            ..Default::default()
        };
        let guard = PermissionGuard::new(pid("plugin-e"), &perms);
        assert!(guard.can_emit_socket());

        let no_grant = Permissions::default();
        let guard = PermissionGuard::new(pid("plugin-e"), &no_grant);
        assert!(!guard.can_emit_socket());
    }
}
