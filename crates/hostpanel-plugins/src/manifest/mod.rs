//! Plugin manifest describing a plugin's identity and entry point.
//!
//! Every installed plugin lives in its own directory under the plugin root
//! and carries a `plugin.toml` manifest. Manifests are validated on
//! registration so a malformed plugin is rejected before anything tries to
//! load it.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PluginError;

/// File name of the manifest inside a plugin directory.
pub const MANIFEST_FILE: &str = "plugin.toml";

/// Declarative description of an installed plugin.
///
/// # Example
///
/// ```
/// use hostpanel_plugins::PluginManifest;
///
/// let manifest = PluginManifest::new("backup", "1.2.0", "Backup.php");
/// assert_eq!(manifest.name(), "backup");
/// assert!(manifest.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    name: String,
    version: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    author: String,
    entry: PathBuf,
}

impl PluginManifest {
    /// Creates a manifest with an empty description and author.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        entry: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: String::new(),
            author: String::new(),
            entry: entry.into(),
        }
    }

    /// Sets the human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Reads and parses a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Io`] when the file cannot be read and
    /// [`PluginError::ManifestParse`] when it is not a valid manifest.
    pub fn from_file(path: &Path) -> Result<Self, PluginError> {
        let raw = fs::read_to_string(path).map_err(|source| PluginError::io(path, source))?;
        toml::from_str(&raw).map_err(|source| PluginError::ManifestParse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }

    /// Validates the manifest, returning an error if it is malformed.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Manifest`] if the name is empty or contains
    /// characters outside `[A-Za-z0-9_-]`, or if the entry point is not a
    /// relative path confined to the plugin directory.
    pub fn validate(&self) -> Result<(), PluginError> {
        if self.name.trim().is_empty() {
            return Err(PluginError::Manifest {
                message: String::from("plugin name must not be empty"),
            });
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(PluginError::Manifest {
                message: format!("plugin name '{}' contains invalid characters", self.name),
            });
        }
        let confined = self
            .entry
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
        if self.entry.as_os_str().is_empty() || !confined {
            return Err(PluginError::Manifest {
                message: format!(
                    "plugin '{}' entry point must be a relative path inside the plugin, got '{}'",
                    self.name,
                    self.entry.display()
                ),
            });
        }
        Ok(())
    }

    /// Returns the plugin name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the plugin version.
    #[must_use]
    pub const fn version(&self) -> &str {
        self.version.as_str()
    }

    /// Returns the description.
    #[must_use]
    pub const fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Returns the author.
    #[must_use]
    pub const fn author(&self) -> &str {
        self.author.as_str()
    }

    /// Returns the entry point relative to the plugin directory.
    #[must_use]
    pub fn entry(&self) -> &Path {
        &self.entry
    }
}
