//! Crate-level integration and BDD tests.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use crate::loader::{EntryPointLoader, PluginManager};
use crate::manifest::MANIFEST_FILE;
use crate::registry::PluginRegistry;


fn install_plugin(root: &Path, name: &str, with_entry: bool) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).expect("create plugin dir");
    fs::write(
        dir.join(MANIFEST_FILE),
        format!("name = \"{name}\"\nversion = \"1.0.0\"\nentry = \"init.php\"\n"),
    )
    .expect("write manifest");
    if with_entry {
        fs::write(dir.join("init.php"), "<?php").expect("write entry point");
    }
}

#[test]
fn end_to_end_discovery_and_loading() {
    let dir = TempDir::new().expect("temp dir");
    install_plugin(dir.path(), "backup", true);
    install_plugin(dir.path(), "monitor", true);

    let registry = PluginRegistry::discover(dir.path()).expect("discover");
    let manager = PluginManager::new(registry, EntryPointLoader);
    let loaded = manager.load_all().expect("load");

    assert_eq!(loaded.len(), 2);
}
