use std::fmt;

use serde::{Deserialize, Serialize};

/// A validated plugin identifier: starts with a lowercase letter, and
/// contains only lowercase letters, digits, and hyphens thereafter.
///
/// This is the sole namespace prefix used to disambiguate tools, skills,
/// and memory keys (§3).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PluginId(String);

/// Error returned when a candidate string is not a valid plugin identifier.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid plugin id {0:?}: must match ^[a-z][a-z0-9-]*$")]
pub struct PluginIdError(pub String);

impl PluginId {
    /// Validate and construct a `PluginId`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginIdError`] if `raw` does not match `^[a-z][a-z0-9-]*$`.
    pub fn parse(raw: impl Into<String>) -> Result<Self, PluginIdError> {
        let raw = raw.into();
        let mut chars = raw.chars();
        let valid = matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
            && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if valid && !raw.is_empty() {
            Ok(Self(raw))
        } else {
            Err(PluginIdError(raw))
        }
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PluginId {
    type Error = PluginIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<PluginId> for String {
    fn from(value: PluginId) -> Self {
        value.0
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PluginId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_ids() {
        assert!(PluginId::parse("weather").is_ok());
        assert!(PluginId::parse("search-web").is_ok());
        assert!(PluginId::parse("a1-b2").is_ok());
    }

    #[test]
    fn rejects_uppercase_and_leading_digit() {
        assert!(PluginId::parse("Weather").is_err());
        assert!(PluginId::parse("1plugin").is_err());
        assert!(PluginId::parse("").is_err());
        assert!(PluginId::parse("has_underscore").is_err());
    }

    #[test]
    fn display_roundtrips() {
        let id = PluginId::parse("search-web").unwrap();
        assert_eq!(id.to_string(), "search-web");
        assert_eq!(id.as_str(), "search-web");
    }
}
