//! Plugin loader double with scripted failures.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use hostpanel_plugins::{LoadedPlugin, PluginEntry, PluginError, PluginLoader};

/// Loads every plugin except the ones told to fail, recording attempts.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPluginLoader {
    failing: BTreeSet<String>,
    attempts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedPluginLoader {
    /// Makes loading `name` fail.
    #[must_use]
    pub fn failing_on(mut self, name: &str) -> Self {
        self.failing.insert(name.to_owned());
        self
    }

    /// Plugins the loader was asked to load, in order.
    #[must_use]
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().expect("loader mutex poisoned").clone()
    }
}

impl PluginLoader for ScriptedPluginLoader {
    fn load(&self, entry: &PluginEntry) -> Result<LoadedPlugin, PluginError> {
        let manifest = entry.manifest();
        self.attempts
            .lock()
            .expect("loader mutex poisoned")
            .push(manifest.name().to_owned());
        if self.failing.contains(manifest.name()) {
            return Err(PluginError::EntryNotFound {
                name: manifest.name().to_owned(),
                path: entry.entry_path(),
            });
        }
        Ok(LoadedPlugin::new(manifest.name(), manifest.version()))
    }
}
