use std::path::PathBuf;

/// Errors raised while loading a single plugin candidate. The loader
/// (§4.6) logs these and continues with the next candidate; one plugin's
/// error never aborts the scan.
#[derive(Debug, thiserror::Error)]
pub enum PluginLoadError {
    /// The candidate directory has no manifest file.
    #[error("missing manifest file at {0}")]
    MissingManifest(PathBuf),
    /// The candidate directory has no readme file.
    #[error("missing readme file in {0}")]
    MissingReadme(PathBuf),
    /// The manifest file could not be read from disk.
    #[error("failed to read manifest {path}: {source}")]
    Io {
        /// Manifest path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The manifest failed schema validation; every field-path failure is
    /// collected into one message.
    #[error("manifest {path} failed validation: {}", .errors.join("; "))]
    Invalid {
        /// Manifest path.
        path: PathBuf,
        /// One message per failing field.
        errors: Vec<String>,
    },
    /// The manifest's `main` entry file does not exist under the plugin
    /// directory.
    #[error("entry file {entry} does not exist for plugin {plugin_id}")]
    EntryMissing {
        /// Plugin id.
        plugin_id: String,
        /// Resolved absolute entry path.
        entry: PathBuf,
    },
}

/// Convenience alias for [`PluginLoadError`]-returning results.
pub type PluginLoadResult<T> = Result<T, PluginLoadError>;
