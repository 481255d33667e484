//! The `frontclaw.json` manifest schema (§3, §6) and its validation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use bastion_core::PluginId;
use bastion_permissions::Permissions;

/// Standard manifest file name, at the root of every plugin directory.
pub const MANIFEST_FILE_NAME: &str = "frontclaw.json";

/// Author metadata, optional on the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    /// Author name.
    pub name: String,
    /// Optional contact email.
    pub email: Option<String>,
    /// Optional homepage/profile URL.
    pub url: Option<String>,
}

/// Raw, as-parsed shape of `frontclaw.json`. Every optional field defaults
/// per §6 before validation promotes this into a [`Manifest`].
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ManifestFile {
    pub id: Option<String>,
    pub name: Option<String>,
    pub version: Option<String>,
    pub main: Option<String>,
    pub permissions: Option<Permissions>,
    pub description: Option<String>,
    pub author: Option<Author>,
    pub priority: Option<i64>,
    #[serde(rename = "configSchema")]
    pub config_schema: Option<Value>,
    #[serde(rename = "defaultConfig")]
    pub default_config: Option<Value>,
    #[serde(rename = "minFrontclawVersion")]
    pub min_frontclaw_version: Option<String>,
    pub tags: Option<Vec<String>>,
    pub enabled: Option<bool>,
}

/// A validated plugin manifest (§3 "Plugin manifest"), immutable after
/// load.
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Stable, validated plugin identifier.
    pub id: PluginId,
    /// Human-readable name.
    pub name: String,
    /// Three-component version string (`MAJOR.MINOR.PATCH`).
    pub version: String,
    /// Entry path, relative to the plugin directory.
    pub main: String,
    /// Declared capability grants.
    pub permissions: Permissions,
    /// Optional human description.
    pub description: Option<String>,
    /// Optional author metadata.
    pub author: Option<Author>,
    /// Load/run priority; lower runs first (0-1000, ties broken by id).
    pub priority: i64,
    /// Optional JSON schema for `defaultConfig`'s shape.
    pub config_schema: Option<Value>,
    /// Default configuration values, merged under user overrides.
    pub default_config: Value,
    /// Minimum required host version, if declared.
    pub min_frontclaw_version: Option<String>,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Whether the plugin should be loaded at all.
    pub enabled: bool,
}

const DEFAULT_PRIORITY: i64 = 100;
const MIN_PRIORITY: i64 = 0;
const MAX_PRIORITY: i64 = 1000;

fn is_strict_semver(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    parts.len() == 3 && parts.iter().all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
}

impl ManifestFile {
    /// Parse `raw` and validate every field, collecting all field-path
    /// errors into one list rather than failing on the first (§4.6).
    pub(crate) fn validate(self, manifest_path: &Path) -> Result<Manifest, Vec<String>> {
        let mut errors = Vec::new();

        let id = match self.id.as_deref() {
            None => {
                errors.push("id: required".to_string());
                None
            }
            Some(raw) => match PluginId::parse(raw) {
                Ok(id) => Some(id),
                Err(e) => {
                    errors.push(format!("id: {e}"));
                    None
                }
            },
        };

        let name = self.name.filter(|n| !n.is_empty()).or_else(|| {
            errors.push("name: required".to_string());
            None
        });

        let version = self.version.filter(|v| is_strict_semver(v)).or_else(|| {
            errors.push("version: must be MAJOR.MINOR.PATCH".to_string());
            None
        });

        let main = self.main.filter(|m| !m.is_empty()).or_else(|| {
            errors.push("main: required".to_string());
            None
        });

        let permissions = self.permissions.unwrap_or_else(|| {
            errors.push("permissions: required".to_string());
            Permissions::default()
        });

        let priority = self.priority.unwrap_or(DEFAULT_PRIORITY);
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
            errors.push(format!("priority: must be between {MIN_PRIORITY} and {MAX_PRIORITY}"));
        }

        if let Some(min_version) = &self.min_frontclaw_version {
            if !is_strict_semver(min_version) {
                errors.push("minFrontclawVersion: must be MAJOR.MINOR.PATCH".to_string());
            }
        }

        if !errors.is_empty() {
            return Err(errors
                .into_iter()
                .map(|e| format!("{}: {e}", manifest_path.display()))
                .collect());
        }

        Ok(Manifest {
            id: id.expect("validated above"),
            name: name.expect("validated above"),
            version: version.expect("validated above"),
            main: main.expect("validated above"),
            permissions,
            description: self.description,
            author: self.author,
            priority,
            config_schema: self.config_schema,
            default_config: self.default_config.unwrap_or_else(|| Value::Object(serde_json::Map::new())),
            min_frontclaw_version: self.min_frontclaw_version,
            tags: self.tags.unwrap_or_default(),
            enabled: self.enabled.unwrap_or(true),
        })
    }
}

impl Manifest {
    /// Resolve the entry file's absolute path under `plugin_dir`.
    #[must_use]
    pub fn entry_path(&self, plugin_dir: &Path) -> PathBuf {
        plugin_dir.join(&self.main)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(id: &str) -> ManifestFile {
        ManifestFile {
            id: Some(id.to_string()),
            name: Some("Test Plugin".to_string()),
            version: Some("1.0.0".to_string()),
            main: Some("index.js".to_string()),
            permissions: Some(Permissions::default()),
            description: None,
            author: None,
            priority: None,
            config_schema: None,
            default_config: None,
            min_frontclaw_version: None,
            tags: None,
            enabled: None,
        }
    }

    #[test]
    fn valid_manifest_gets_defaults() {
        let manifest = file("weather-plugin")
            .validate(Path::new("frontclaw.json"))
            .unwrap();
        assert_eq!(manifest.priority, DEFAULT_PRIORITY);
        assert!(manifest.enabled);
        assert_eq!(manifest.tags, Vec::<String>::new());
    }

    #[test]
    fn invalid_id_and_version_are_both_collected() {
        let mut raw = file("Not Valid");
        raw.version = Some("1.0".to_string());
        let errors = raw.validate(Path::new("frontclaw.json")).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn priority_out_of_range_is_rejected() {
        let mut raw = file("plugin-a");
        raw.priority = Some(5000);
        let errors = raw.validate(Path::new("frontclaw.json")).unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn entry_path_resolves_under_plugin_dir() {
        let manifest = file("plugin-a").validate(Path::new("frontclaw.json")).unwrap();
        let resolved = manifest.entry_path(Path::new("/plugins/plugin-a"));
        assert_eq!(resolved, PathBuf::from("/plugins/plugin-a/index.js"));
    }
}
