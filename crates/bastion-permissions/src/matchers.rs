//! Pattern matchers shared across capability families (§4.3).
//!
//! Memory keys, socket events, and skill names all use the same
//! literal-prefix/wildcard matcher shape (`SPEC_FULL.md` §B.6 keeps this
//! uniform rather than inventing one shape per family).

/// Match a key/event/skill-local-name pattern against a candidate.
///
/// - `"*"` matches anything.
/// - `"prefix:*"` (or any pattern ending in `*`) matches by literal prefix
///   up to the `*`.
/// - Anything else requires exact equality.
#[must_use]
pub fn key_pattern_matches(pattern: &str, candidate: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix('*') {
        return candidate.starts_with(prefix);
    }
    pattern == candidate
}

/// Match a full skill name (`"pluginId__localName"`, or a bare `localName`
/// for same-plugin calls) against a plugin's declared skill grant entries.
///
/// Each grant entry is one of `name`, `plugin__name`, or `plugin__*`. The
/// namespace `plugin__` prefix on the *candidate* is stripped before
/// comparison against bare-`name` entries, and `__*`-suffixed entries match
/// by literal prefix up to the wildcard (§4.3 "Skills").
#[must_use]
pub fn skill_matches(grant_entries: &[String], full_name: &str) -> bool {
    let local_name = full_name
        .split_once("__")
        .map_or(full_name, |(_, rest)| rest);

    grant_entries.iter().any(|entry| {
        if entry == "*" {
            return true;
        }
        if let Some(prefix) = entry.strip_suffix("__*") {
            return full_name.starts_with(prefix) || local_name.starts_with(prefix);
        }
        entry == full_name || entry == local_name
    })
}

/// Match a request host against a `network.allowed_domains` entry.
///
/// An entry equals the host exactly, or (for `"*.suffix"` entries) the host
/// either equals `suffix` or ends with `.suffix` (§4.3 "Network").
#[must_use]
pub fn domain_matches(entry: &str, host: &str) -> bool {
    if let Some(suffix) = entry.strip_prefix("*.") {
        return host == suffix || host.ends_with(&format!(".{suffix}"));
    }
    entry == host
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_pattern_star_matches_everything() {
        assert!(key_pattern_matches("*", "anything"));
    }

    #[test]
    fn key_pattern_prefix_matches() {
        assert!(key_pattern_matches("profile:*", "profile:42"));
        assert!(!key_pattern_matches("profile:*", "other:1"));
    }

    #[test]
    fn key_pattern_exact_requires_equality() {
        assert!(key_pattern_matches("exact", "exact"));
        assert!(!key_pattern_matches("exact", "exactish"));
    }

    #[test]
    fn skill_matches_bare_name() {
        assert!(skill_matches(&["search".to_string()], "other-plugin__search"));
        assert!(skill_matches(&["search".to_string()], "search"));
    }

    #[test]
    fn skill_matches_namespaced_entry() {
        let entries = vec!["weather__forecast".to_string()];
        assert!(skill_matches(&entries, "weather__forecast"));
        assert!(!skill_matches(&entries, "weather__current"));
    }

    #[test]
    fn skill_matches_namespaced_wildcard() {
        let entries = vec!["weather__*".to_string()];
        assert!(skill_matches(&entries, "weather__forecast"));
        assert!(!skill_matches(&entries, "traffic__forecast"));
    }

    #[test]
    fn skill_matches_global_wildcard() {
        assert!(skill_matches(&["*".to_string()], "anything__anything"));
    }

    #[test]
    fn domain_matches_exact() {
        assert!(domain_matches("example.com", "example.com"));
        assert!(!domain_matches("example.com", "evil.com"));
    }

    #[test]
    fn domain_matches_suffix_wildcard() {
        assert!(domain_matches("*.example.com", "api.example.com"));
        assert!(domain_matches("*.example.com", "example.com"));
        assert!(!domain_matches("*.example.com", "notexample.com"));
    }
}
