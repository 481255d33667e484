//! Directory-based plugin discovery (§4.6).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::PluginLoadError;
use crate::manifest::{Manifest, ManifestFile, MANIFEST_FILE_NAME};

const README_CANDIDATES: &[&str] = &["README.md", "readme.md", "README.txt", "README"];

/// A fully loaded plugin: validated manifest plus the resolved directory
/// and entry path and the merged configuration (§3 "Loaded plugin record").
#[derive(Debug, Clone)]
pub struct LoadedPlugin {
    /// The validated manifest.
    pub manifest: Manifest,
    /// Absolute plugin directory.
    pub plugin_dir: PathBuf,
    /// Absolute entry file path.
    pub entry_path: PathBuf,
    /// `{...defaults, ...userOverrides[id]}`.
    pub config: Value,
}

/// Scan `plugin_dir`, treating each immediate subdirectory as a plugin
/// candidate. `config_overrides` maps plugin id to a JSON object merged
/// atop the manifest's `defaultConfig`. `deny_list` names plugin ids to
/// drop regardless of their manifest's `enabled` flag.
///
/// Errors in one candidate are logged and skipped; they never prevent
/// other candidates from loading (§4.6). The returned list is sorted by
/// ascending priority, ties broken by plugin id.
pub fn load_plugins(
    plugin_dir: &Path,
    extra_plugin_paths: &[PathBuf],
    config_overrides: &HashMap<String, Value>,
    deny_list: &[String],
) -> Vec<LoadedPlugin> {
    let mut candidates = Vec::new();
    if plugin_dir.is_dir() {
        candidates.push(plugin_dir.to_path_buf());
    }
    candidates.extend(extra_plugin_paths.iter().cloned());

    let mut loaded = Vec::new();
    for dir in candidates {
        loaded.extend(scan_directory(&dir, config_overrides, deny_list));
    }

    loaded.sort_by(|a, b| {
        a.manifest
            .priority
            .cmp(&b.manifest.priority)
            .then_with(|| a.manifest.id.as_ref().cmp(b.manifest.id.as_ref()))
    });
    loaded
}

fn scan_directory(
    dir: &Path,
    config_overrides: &HashMap<String, Value>,
    deny_list: &[String],
) -> Vec<LoadedPlugin> {
    let mut loaded = Vec::new();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "failed to scan plugin directory");
            return loaded;
        }
    };

    for entry in entries {
        let Ok(entry) = entry else { continue };
        let candidate_dir = entry.path();
        if !candidate_dir.is_dir() {
            continue;
        }

        match load_candidate(&candidate_dir, config_overrides, deny_list) {
            Ok(Some(plugin)) => {
                debug!(plugin_id = %plugin.manifest.id, dir = %candidate_dir.display(), "loaded plugin");
                loaded.push(plugin);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(dir = %candidate_dir.display(), error = %e, "failed to load plugin candidate");
            }
        }
    }

    loaded
}

/// Load one candidate directory. Returns `Ok(None)` when the plugin is
/// valid but disabled or denied (not an error, just excluded).
fn load_candidate(
    candidate_dir: &Path,
    config_overrides: &HashMap<String, Value>,
    deny_list: &[String],
) -> Result<Option<LoadedPlugin>, PluginLoadError> {
    let manifest_path = candidate_dir.join(MANIFEST_FILE_NAME);
    if !manifest_path.is_file() {
        return Err(PluginLoadError::MissingManifest(candidate_dir.to_path_buf()));
    }

    if !README_CANDIDATES
        .iter()
        .any(|name| candidate_dir.join(name).is_file())
    {
        return Err(PluginLoadError::MissingReadme(candidate_dir.to_path_buf()));
    }

    let raw = std::fs::read_to_string(&manifest_path).map_err(|e| PluginLoadError::Io {
        path: manifest_path.clone(),
        source: e,
    })?;

    let file: ManifestFile = serde_json::from_str(&raw).map_err(|e| PluginLoadError::Invalid {
        path: manifest_path.clone(),
        errors: vec![e.to_string()],
    })?;

    let manifest = file
        .validate(&manifest_path)
        .map_err(|errors| PluginLoadError::Invalid {
            path: manifest_path.clone(),
            errors,
        })?;

    let entry_path = manifest.entry_path(candidate_dir);
    if !entry_path.is_file() {
        return Err(PluginLoadError::EntryMissing {
            plugin_id: manifest.id.to_string(),
            entry: entry_path,
        });
    }

    if !manifest.enabled || deny_list.iter().any(|id| id == manifest.id.as_ref()) {
        return Ok(None);
    }

    let config = merge_config(&manifest.default_config, config_overrides.get(manifest.id.as_ref()));

    Ok(Some(LoadedPlugin {
        manifest,
        plugin_dir: candidate_dir.to_path_buf(),
        entry_path,
        config,
    }))
}

fn merge_config(defaults: &Value, overrides: Option<&Value>) -> Value {
    let mut merged = defaults.clone();
    if let (Some(Value::Object(over)), Value::Object(base)) = (overrides, &mut merged) {
        for (k, v) in over {
            base.insert(k.clone(), v.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn write_plugin(root: &Path, id: &str, priority: i64, enabled: bool) {
        let dir = root.join(id);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("README.md"), "readme").unwrap();
        fs::write(dir.join("index.js"), "// entry").unwrap();
        let manifest = json!({
            "id": id,
            "name": id,
            "version": "1.0.0",
            "main": "index.js",
            "permissions": {},
            "priority": priority,
            "enabled": enabled,
        });
        fs::write(dir.join(MANIFEST_FILE_NAME), manifest.to_string()).unwrap();
    }

    #[test]
    fn loads_and_sorts_by_priority_then_id() {
        let tmp = tempfile::tempdir().unwrap();
        write_plugin(tmp.path(), "zeta", 50, true);
        write_plugin(tmp.path(), "alpha", 50, true);
        write_plugin(tmp.path(), "beta", 10, true);

        let loaded = load_plugins(tmp.path(), &[], &HashMap::new(), &[]);
        let ids: Vec<&str> = loaded.iter().map(|p| p.manifest.id.as_ref()).collect();
        assert_eq!(ids, vec!["beta", "alpha", "zeta"]);
    }

    #[test]
    fn disabled_plugin_is_dropped() {
        let tmp = tempfile::tempdir().unwrap();
        write_plugin(tmp.path(), "alpha", 50, false);
        let loaded = load_plugins(tmp.path(), &[], &HashMap::new(), &[]);
        assert!(loaded.is_empty());
    }

    #[test]
    fn deny_listed_plugin_is_dropped() {
        let tmp = tempfile::tempdir().unwrap();
        write_plugin(tmp.path(), "alpha", 50, true);
        let loaded = load_plugins(tmp.path(), &[], &HashMap::new(), &["alpha".to_string()]);
        assert!(loaded.is_empty());
    }

    #[test]
    fn missing_readme_is_skipped_without_aborting_others() {
        let tmp = tempfile::tempdir().unwrap();
        let bad = tmp.path().join("bad");
        fs::create_dir_all(&bad).unwrap();
        fs::write(bad.join("index.js"), "// entry").unwrap();
        fs::write(
            bad.join(MANIFEST_FILE_NAME),
            json!({"id":"bad","name":"bad","version":"1.0.0","main":"index.js","permissions":{}})
                .to_string(),
        )
        .unwrap();
        write_plugin(tmp.path(), "good", 50, true);

        let loaded = load_plugins(tmp.path(), &[], &HashMap::new(), &[]);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].manifest.id.as_ref(), "good");
    }

    #[test]
    fn config_overrides_merge_over_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("alpha");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("README.md"), "readme").unwrap();
        fs::write(dir.join("index.js"), "// entry").unwrap();
        let manifest = json!({
            "id": "alpha",
            "name": "alpha",
            "version": "1.0.0",
            "main": "index.js",
            "permissions": {},
            "defaultConfig": {"a": 1, "b": 2},
        });
        fs::write(dir.join(MANIFEST_FILE_NAME), manifest.to_string()).unwrap();

        let mut overrides = HashMap::new();
        overrides.insert("alpha".to_string(), json!({"b": 99}));

        let loaded = load_plugins(tmp.path(), &[], &overrides, &[]);
        assert_eq!(loaded[0].config, json!({"a": 1, "b": 99}));
    }
}
