//! Registry of installed plugins and their error flags.
//!
//! The [`PluginRegistry`] stores validated manifests keyed by name, in name
//! order, together with the directory each plugin was found in and an
//! optional error flag recorded by an earlier failed operation. Flagged
//! plugins stay listed but are skipped at load time.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::PluginError;
use crate::manifest::{MANIFEST_FILE, PluginManifest};

const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// A discovered plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginEntry {
    manifest: PluginManifest,
    root: PathBuf,
    error: Option<String>,
}

impl PluginEntry {
    /// Plugin manifest.
    #[must_use]
    pub const fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    /// Directory the plugin is installed in.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of the plugin entry point.
    #[must_use]
    pub fn entry_path(&self) -> PathBuf {
        self.root.join(self.manifest.entry())
    }

    /// Error recorded for this plugin, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Registry of installed plugins.
///
/// # Example
///
/// ```
/// use hostpanel_plugins::{PluginManifest, PluginRegistry};
///
/// let mut registry = PluginRegistry::new();
/// registry
///     .register(PluginManifest::new("backup", "1.0.0", "Backup.php"), "/srv/plugins/backup")
///     .expect("registration succeeds");
/// registry.flag_error("backup", "missing dependency").expect("plugin exists");
/// assert!(registry.has_error("backup"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<String, PluginEntry>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans `plugins_dir` for `<name>/plugin.toml` manifests.
    ///
    /// A missing plugin directory yields an empty registry. Directories
    /// without a manifest are ignored; unreadable or invalid manifests are
    /// logged and skipped so one broken plugin cannot take the panel down.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Io`] when the plugin directory exists but
    /// cannot be listed.
    pub fn discover(plugins_dir: &Path) -> Result<Self, PluginError> {
        let mut registry = Self::new();
        let entries = match fs::read_dir(plugins_dir) {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!(
                    target: REGISTRY_TARGET,
                    dir = %plugins_dir.display(),
                    "plugin directory absent; no plugins installed"
                );
                return Ok(registry);
            }
            Err(source) => return Err(PluginError::io(plugins_dir, source)),
        };

        for entry in entries {
            let entry = entry.map_err(|source| PluginError::io(plugins_dir, source))?;
            let root = entry.path();
            let manifest_path = root.join(MANIFEST_FILE);
            if !root.is_dir() || !manifest_path.is_file() {
                continue;
            }
            if let Err(error) = registry.discover_one(&root, &manifest_path) {
                warn!(
                    target: REGISTRY_TARGET,
                    plugin_dir = %root.display(),
                    error = %error,
                    "skipping plugin with an invalid manifest"
                );
            }
        }

        debug!(
            target: REGISTRY_TARGET,
            dir = %plugins_dir.display(),
            count = registry.len(),
            "plugin discovery complete"
        );
        Ok(registry)
    }

    fn discover_one(&mut self, root: &Path, manifest_path: &Path) -> Result<(), PluginError> {
        let manifest = PluginManifest::from_file(manifest_path)?;
        let dir_name = root.file_name().and_then(|name| name.to_str());
        if dir_name != Some(manifest.name()) {
            return Err(PluginError::Manifest {
                message: format!(
                    "plugin '{}' is installed in a directory with a different name",
                    manifest.name()
                ),
            });
        }
        self.register(manifest, root)
    }

    /// Registers a plugin manifest after validation.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Manifest`] if validation fails or if a plugin
    /// with the same name is already registered.
    pub fn register(
        &mut self,
        manifest: PluginManifest,
        root: impl Into<PathBuf>,
    ) -> Result<(), PluginError> {
        manifest.validate()?;
        let name = manifest.name().to_owned();
        if self.plugins.contains_key(&name) {
            return Err(PluginError::Manifest {
                message: format!("plugin '{name}' is already registered"),
            });
        }
        self.plugins.insert(
            name,
            PluginEntry {
                manifest,
                root: root.into(),
                error: None,
            },
        );
        Ok(())
    }

    /// Records an error against a plugin so later loads skip it.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] when no such plugin is registered.
    pub fn flag_error(&mut self, name: &str, message: impl Into<String>) -> Result<(), PluginError> {
        let entry = self
            .plugins
            .get_mut(name)
            .ok_or_else(|| PluginError::NotFound {
                name: name.to_owned(),
            })?;
        entry.error = Some(message.into());
        Ok(())
    }

    /// Applies stored error flags, ignoring flags for plugins that are no
    /// longer installed.
    pub fn apply_errors<I, N, M>(&mut self, errors: I)
    where
        I: IntoIterator<Item = (N, M)>,
        N: AsRef<str>,
        M: Into<String>,
    {
        for (name, message) in errors {
            if self.flag_error(name.as_ref(), message).is_err() {
                debug!(
                    target: REGISTRY_TARGET,
                    plugin = name.as_ref(),
                    "error flag refers to a plugin that is not installed"
                );
            }
        }
    }

    /// Looks up a plugin by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PluginEntry> {
        self.plugins.get(name)
    }

    /// Returns `true` when the plugin carries an error flag.
    #[must_use]
    pub fn has_error(&self, name: &str) -> bool {
        self.plugins
            .get(name)
            .is_some_and(|entry| entry.error.is_some())
    }

    /// Plugin names in load order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.plugins.keys().map(String::as_str).collect()
    }

    /// Iterates over plugins in load order.
    pub fn iter(&self) -> impl Iterator<Item = &PluginEntry> {
        self.plugins.values()
    }

    /// Returns the number of registered plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns `true` when no plugins are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
