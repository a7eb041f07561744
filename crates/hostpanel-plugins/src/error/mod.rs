//! Domain errors raised while discovering and loading plugins.
//!
//! All errors use `thiserror`-derived enums with structured context so callers
//! can inspect the failure programmatically. I/O errors are wrapped in `Arc`
//! to satisfy the `result_large_err` Clippy lint.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors arising from plugin operations.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The requested plugin was not found in the registry.
    #[error("plugin '{name}' not found in registry")]
    NotFound {
        /// Name that was looked up.
        name: String,
    },

    /// A plugin manifest failed validation.
    #[error("manifest error: {message}")]
    Manifest {
        /// Description of the validation failure.
        message: String,
    },

    /// A manifest file could not be parsed.
    #[error("failed to parse plugin manifest '{path}': {source}")]
    ManifestParse {
        /// Manifest file that was read.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: Box<toml::de::Error>,
    },

    /// The plugin directory or a manifest could not be read.
    #[error("I/O error reading plugin data at '{path}': {source}")]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The plugin entry point does not exist.
    #[error("plugin '{name}' entry point not found: {path}")]
    EntryNotFound {
        /// Plugin name.
        name: String,
        /// Path that was checked.
        path: PathBuf,
    },

    /// The loader rejected the plugin.
    #[error("plugin '{name}' rejected by loader: {message}")]
    Rejected {
        /// Plugin name.
        name: String,
        /// Human-readable failure description.
        message: String,
    },

    /// Loading a non-errored plugin failed; fatal to the whole bootstrap.
    #[error("couldn't load plugin: {name}")]
    Load {
        /// Plugin that failed.
        name: String,
        /// Failure reported by the loader.
        #[source]
        source: Box<PluginError>,
    },
}

impl PluginError {
    /// Builds an I/O error for `path`.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }
}
