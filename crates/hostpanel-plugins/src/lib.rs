//! Plugin discovery and loading for the hosting panel.
//!
//! Plugins are installed one per directory under the configured plugin root,
//! each with a `plugin.toml` [`PluginManifest`]. The [`PluginRegistry`] lists
//! them in name order together with error flags recorded by the panel (a
//! plugin whose last install or update failed is flagged and skipped). The
//! [`PluginManager`] then loads every unflagged plugin through a
//! [`PluginLoader`] and stops at the first failure.
//!
//! # Example
//!
//! ```
//! use hostpanel_plugins::{EntryPointLoader, PluginManager, PluginRegistry};
//! use std::path::Path;
//!
//! let registry = PluginRegistry::discover(Path::new("/nonexistent/plugins"))
//!     .expect("a missing plugin root is not an error");
//! let manager = PluginManager::new(registry, EntryPointLoader);
//! assert!(manager.load_all().expect("nothing to load").is_empty());
//! ```

pub mod error;
pub mod loader;
pub mod manifest;
pub mod registry;

#[cfg(test)]
mod tests;

pub use self::error::PluginError;
pub use self::loader::{EntryPointLoader, LoadedPlugin, PluginLoader, PluginManager};
pub use self::manifest::{MANIFEST_FILE, PluginManifest};
pub use self::registry::{PluginEntry, PluginRegistry};
