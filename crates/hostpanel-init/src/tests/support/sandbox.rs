//! Temporary panel installation used by unit and behaviour tests.

use std::collections::BTreeMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use hostpanel_config::{InitScope, PanelConfig, PanelPaths};
use hostpanel_plugins::MANIFEST_FILE;
use rusqlite::Connection;
use tempfile::TempDir;

use crate::database::KeyMaterial;

/// Tables read by the initializer and the IP usage page.
pub const SCHEMA: &str = "
    CREATE TABLE config (name TEXT PRIMARY KEY, value TEXT);
    CREATE TABLE user_gui_props (user_id INTEGER PRIMARY KEY, lang TEXT, layout TEXT);
    CREATE TABLE plugin (plugin_name TEXT PRIMARY KEY, plugin_error TEXT);
    CREATE TABLE reseller_props (reseller_id INTEGER PRIMARY KEY, reseller_ips TEXT);
    CREATE TABLE server_ips (ip_id INTEGER PRIMARY KEY, ip_number TEXT NOT NULL);
    CREATE TABLE domain (
        domain_id INTEGER PRIMARY KEY,
        domain_name TEXT NOT NULL,
        domain_ip_id INTEGER NOT NULL,
        domain_created_id INTEGER NOT NULL
    );
    CREATE TABLE domain_aliasses (
        alias_id INTEGER PRIMARY KEY,
        domain_id INTEGER NOT NULL,
        alias_name TEXT NOT NULL,
        alias_ip_id INTEGER NOT NULL
    );
";

/// Password stored encrypted by [`PanelSandbox::install_keys`].
pub const DATABASE_PASSWORD: &str = "s3cret";

/// Panel directory layout rooted in a temporary directory.
pub struct PanelSandbox {
    _dir: TempDir,
    root: Utf8PathBuf,
    config: PanelConfig,
    paths: PanelPaths,
}

impl PanelSandbox {
    /// Creates the directory layout with request-scoped initialization.
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temporary panel root");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .expect("temporary directory path is UTF-8");
        let config = PanelConfig {
            gui_root_dir: root.join("gui"),
            conf_dir: root.join("conf"),
            cache_dir: root.join("cache"),
            plugins_dir: root.join("plugins"),
            database_name: root.join("panel.db").into_string(),
            init_scope: InitScope::Request,
            ..PanelConfig::default()
        };
        let paths = config.paths();
        for directory in [
            paths.session_dir(),
            config.conf_dir.as_path(),
            config.cache_dir.as_path(),
            paths.plugins_dir(),
        ] {
            fs::create_dir_all(directory).expect("create sandbox directory");
        }
        Self {
            _dir: dir,
            root,
            config,
            paths,
        }
    }

    /// Sandbox with key material, an encrypted password and an empty
    /// database, ready for a full bootstrap.
    #[must_use]
    pub fn provisioned() -> Self {
        let mut sandbox = Self::new();
        sandbox.install_keys(DATABASE_PASSWORD);
        sandbox.create_database();
        sandbox
    }

    /// Root of the sandbox.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Filesystem layout derived from [`Self::config`].
    #[must_use]
    pub const fn paths(&self) -> &PanelPaths {
        &self.paths
    }

    /// Base configuration pointing into the sandbox.
    #[must_use]
    pub fn config(&self) -> PanelConfig {
        self.config.clone()
    }

    /// Mutable access to the base configuration.
    pub const fn config_mut(&mut self) -> &mut PanelConfig {
        &mut self.config
    }

    /// Writes fresh key material and stores `password` encrypted with it.
    pub fn install_keys(&mut self, password: &str) -> String {
        let keys = KeyMaterial::generate();
        fs::write(self.paths.key_material(), keys.to_toml()).expect("write key material");
        let ciphertext = keys.encrypt_password(password).expect("encrypt password");
        self.config.database_password.clone_from(&ciphertext);
        ciphertext
    }

    /// Creates the database file with [`SCHEMA`].
    pub fn create_database(&self) -> Utf8PathBuf {
        let path = Utf8PathBuf::from(&self.config.database_name);
        let connection = Connection::open(&path).expect("create database");
        connection.execute_batch(SCHEMA).expect("apply schema");
        path
    }

    /// Runs `sql` against the sandbox database.
    pub fn seed(&self, sql: &str) {
        let connection = Connection::open(&self.config.database_name).expect("open database");
        connection.execute_batch(sql).expect("seed database");
    }

    /// Installs a compiled message catalog for `locale`.
    pub fn install_catalog(&self, locale: &str, messages: &[(&str, &str)]) {
        let path = self.paths.catalog(locale);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create catalog directory");
        }
        let catalog: BTreeMap<_, _> = messages.iter().copied().collect();
        let json = serde_json::to_string(&catalog).expect("serialize catalog");
        fs::write(path, json).expect("write catalog");
    }

    /// Installs a plugin, optionally without its entry point.
    pub fn install_plugin(&self, name: &str, with_entry: bool) {
        let dir = self.paths.plugins_dir().join(name);
        fs::create_dir_all(&dir).expect("create plugin directory");
        fs::write(
            dir.join(MANIFEST_FILE),
            format!("name = \"{name}\"\nversion = \"1.0.0\"\nentry = \"{name}.php\"\n"),
        )
        .expect("write manifest");
        if with_entry {
            fs::write(dir.join(format!("{name}.php")), "<?php").expect("write entry point");
        }
    }
}

impl Default for PanelSandbox {
    fn default() -> Self {
        Self::new()
    }
}
