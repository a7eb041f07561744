//! Filesystem layout derived from the base configuration.
//!
//! The initializer and the page handlers need to agree on where sessions,
//! caches, catalogs and key material live. Everything is derived from the
//! three root directories in [`PanelConfig`] so a deployment only ever sets
//! those.

use camino::{Utf8Path, Utf8PathBuf};

use crate::PanelConfig;

const KEY_MATERIAL_FILE: &str = "imscp-db-keys";
const OVERLAY_CACHE_FILE: &str = "dbconfig.json";

/// Canonical paths used while bootstrapping a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelPaths {
    gui_root_dir: Utf8PathBuf,
    session_dir: Utf8PathBuf,
    key_material: Utf8PathBuf,
    overlay_cache: Utf8PathBuf,
    translation_cache_dir: Utf8PathBuf,
    plugins_dir: Utf8PathBuf,
}

impl PanelPaths {
    /// Derives the layout from the base configuration.
    #[must_use]
    pub fn from_config(config: &PanelConfig) -> Self {
        Self {
            gui_root_dir: config.gui_root_dir.clone(),
            session_dir: config.gui_root_dir.join("data").join("sessions"),
            key_material: config.conf_dir.join(KEY_MATERIAL_FILE),
            overlay_cache: config.cache_dir.join(OVERLAY_CACHE_FILE),
            translation_cache_dir: config.cache_dir.join("translations"),
            plugins_dir: config.plugins_dir.clone(),
        }
    }

    /// Directory holding one file per session.
    #[must_use]
    pub fn session_dir(&self) -> &Utf8Path {
        &self.session_dir
    }

    /// File containing the database key material.
    #[must_use]
    pub fn key_material(&self) -> &Utf8Path {
        &self.key_material
    }

    /// Cached copy of the database configuration overlay.
    #[must_use]
    pub fn overlay_cache(&self) -> &Utf8Path {
        &self.overlay_cache
    }

    /// Lock file guarding writes to the overlay cache.
    #[must_use]
    pub fn overlay_cache_lock(&self) -> Utf8PathBuf {
        self.overlay_cache.with_extension("json.lock")
    }

    /// Root of the per-locale translation cache.
    #[must_use]
    pub fn translation_cache_dir(&self) -> &Utf8Path {
        &self.translation_cache_dir
    }

    /// Directory containing installed plugins.
    #[must_use]
    pub fn plugins_dir(&self) -> &Utf8Path {
        &self.plugins_dir
    }

    /// Compiled message catalog for `locale`.
    #[must_use]
    pub fn catalog(&self, locale: &str) -> Utf8PathBuf {
        self.gui_root_dir
            .join("i18n")
            .join("locales")
            .join(locale)
            .join("LC_MESSAGES")
            .join(format!("{locale}.json"))
    }

    /// Navigation definition for a user role.
    #[must_use]
    pub fn navigation(&self, role: &str) -> Utf8PathBuf {
        self.gui_root_dir
            .join("data")
            .join("navigation")
            .join(format!("{role}.toml"))
    }
}
