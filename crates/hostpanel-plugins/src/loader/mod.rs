//! Plugin loading with fail-fast semantics.
//!
//! The [`PluginManager`] walks the registry in name order. Plugins carrying
//! an error flag are skipped; every other plugin is handed to a
//! [`PluginLoader`]. The first load failure stops the walk and is reported
//! as [`PluginError::Load`] naming the plugin, so callers can abort the
//! request bootstrap.

use tracing::{debug, info};

use crate::error::PluginError;
use crate::registry::{PluginEntry, PluginRegistry};

const LOADER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::loader");

/// A plugin that has been loaded for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPlugin {
    name: String,
    version: String,
}

impl LoadedPlugin {
    /// Records a loaded plugin.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Plugin name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Plugin version.
    #[must_use]
    pub const fn version(&self) -> &str {
        self.version.as_str()
    }
}

/// Trait abstracting how a single plugin is brought up.
///
/// # Example
///
/// ```
/// use hostpanel_plugins::{LoadedPlugin, PluginEntry, PluginError, PluginLoader};
///
/// struct AcceptAll;
///
/// impl PluginLoader for AcceptAll {
///     fn load(&self, entry: &PluginEntry) -> Result<LoadedPlugin, PluginError> {
///         let manifest = entry.manifest();
///         Ok(LoadedPlugin::new(manifest.name(), manifest.version()))
///     }
/// }
/// ```
pub trait PluginLoader {
    /// Loads one plugin.
    ///
    /// # Errors
    ///
    /// Returns a [`PluginError`] describing why the plugin cannot be loaded.
    fn load(&self, entry: &PluginEntry) -> Result<LoadedPlugin, PluginError>;
}

/// Loader that requires the manifest's entry point to exist on disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct EntryPointLoader;

impl PluginLoader for EntryPointLoader {
    fn load(&self, entry: &PluginEntry) -> Result<LoadedPlugin, PluginError> {
        let manifest = entry.manifest();
        let path = entry.entry_path();
        if !path.is_file() {
            return Err(PluginError::EntryNotFound {
                name: manifest.name().to_owned(),
                path,
            });
        }
        Ok(LoadedPlugin::new(manifest.name(), manifest.version()))
    }
}

/// Loads every non-errored plugin of a registry.
#[derive(Debug)]
pub struct PluginManager<L> {
    registry: PluginRegistry,
    loader: L,
}

impl<L> PluginManager<L> {
    /// Creates a manager over a populated registry.
    #[must_use]
    pub const fn new(registry: PluginRegistry, loader: L) -> Self {
        Self { registry, loader }
    }
}

impl<L> PluginManager<L>
where
    L: PluginLoader,
{
    /// Loads all plugins without an error flag, in name order.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Load`] for the first plugin that fails; no
    /// later plugin is attempted.
    pub fn load_all(&self) -> Result<Vec<LoadedPlugin>, PluginError> {
        let mut loaded = Vec::with_capacity(self.registry.len());
        for entry in self.registry.iter() {
            let name = entry.manifest().name();
            if let Some(error) = entry.error() {
                debug!(
                    target: LOADER_TARGET,
                    plugin = name,
                    error,
                    "skipping plugin with a recorded error"
                );
                continue;
            }
            let plugin = self.loader.load(entry).map_err(|source| PluginError::Load {
                name: name.to_owned(),
                source: Box::new(source),
            })?;
            info!(
                target: LOADER_TARGET,
                plugin = plugin.name(),
                version = plugin.version(),
                "plugin loaded"
            );
            loaded.push(plugin);
        }
        Ok(loaded)
    }
}
