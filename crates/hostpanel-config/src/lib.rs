//! Shared configuration for the hosting panel initializer.
//!
//! [`PanelConfig`] is the typed base configuration. It is layered by
//! `ortho_config` from built-in defaults, a TOML file, `HOSTPANEL_*`
//! environment variables and command-line flags. At request time the base
//! record is flattened into a [`ConfigStore`], a case-insensitive key-value
//! view that the database overlay is merged over.

mod defaults;
mod logging;
mod paths;
mod scope;
mod store;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_CACHE_DIR, DEFAULT_CONF_DIR, DEFAULT_GUI_ROOT_DIR, DEFAULT_LOG_FILTER,
    DEFAULT_PLUGINS_DIR, FALLBACK_LOCALE, FALLBACK_TIMEZONE, default_log_filter,
    default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use paths::PanelPaths;
pub use scope::{InitScope, InitScopeParseError};
pub use store::{ConfigOverlay, ConfigStore, ConfigValue};

/// Base configuration of the control panel.
///
/// Field names double as [`ConfigStore`] keys once the record is flattened,
/// so `debug` here is read back as `store.flag("debug")` after the database
/// overlay has been merged.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "HOSTPANEL")]
pub struct PanelConfig {
    /// Enables debug behaviour: visible errors, no caches.
    #[ortho_config(default = false)]
    pub debug: bool,
    /// Root directory of the web interface.
    #[ortho_config(default = Utf8PathBuf::from(DEFAULT_GUI_ROOT_DIR))]
    pub gui_root_dir: Utf8PathBuf,
    /// Directory holding trusted local configuration such as key material.
    #[ortho_config(default = Utf8PathBuf::from(DEFAULT_CONF_DIR))]
    pub conf_dir: Utf8PathBuf,
    /// Directory for the overlay cache and translation cache.
    #[ortho_config(default = Utf8PathBuf::from(DEFAULT_CACHE_DIR))]
    pub cache_dir: Utf8PathBuf,
    /// Directory containing installed plugins.
    #[ortho_config(default = Utf8PathBuf::from(DEFAULT_PLUGINS_DIR))]
    pub plugins_dir: Utf8PathBuf,
    /// Database driver name.
    #[ortho_config(default = String::from("sqlite"))]
    pub database_type: String,
    /// Database server host.
    #[ortho_config(default = String::from("localhost"))]
    pub database_host: String,
    /// Database name, or the database file for file-backed drivers.
    #[ortho_config(default = String::from("imscp"))]
    pub database_name: String,
    /// Database account name.
    #[ortho_config(default = String::from("imscp_user"))]
    pub database_user: String,
    /// Encrypted database password (base64 ciphertext).
    #[ortho_config(default = String::new())]
    pub database_password: String,
    /// IANA timezone identifier applied to the request.
    #[ortho_config(default = String::from(FALLBACK_TIMEZONE))]
    pub timezone: String,
    /// Default language for users without a stored preference.
    #[ortho_config(default = String::from("auto"))]
    pub user_initial_lang: String,
    /// Default theme for users without a stored preference.
    #[ortho_config(default = String::from("default"))]
    pub user_initial_theme: String,
    /// Layout colour used when the session carries none.
    #[ortho_config(default = String::from("black"))]
    pub layout_color: String,
    /// Compresses rendered pages with gzip.
    #[ortho_config(default = true)]
    pub compress_output: bool,
    /// Appends compression statistics to compressed pages.
    #[ortho_config(default = true)]
    pub show_compression_size: bool,
    /// Newest database schema revision shipped with this build.
    #[ortho_config(default = 0)]
    pub latest_database_revision: u32,
    /// Scope of the one-time initialization guard.
    #[ortho_config(default = InitScope::Process)]
    pub init_scope: InitScope,
    /// Log filter expression understood by `tracing-subscriber`.
    #[ortho_config(default = String::from(DEFAULT_LOG_FILTER))]
    pub log_filter: String,
    /// Log output format.
    #[ortho_config(default = LogFormat::Json)]
    pub log_format: LogFormat,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            debug: false,
            gui_root_dir: Utf8PathBuf::from(DEFAULT_GUI_ROOT_DIR),
            conf_dir: Utf8PathBuf::from(DEFAULT_CONF_DIR),
            cache_dir: Utf8PathBuf::from(DEFAULT_CACHE_DIR),
            plugins_dir: Utf8PathBuf::from(DEFAULT_PLUGINS_DIR),
            database_type: String::from("sqlite"),
            database_host: String::from("localhost"),
            database_name: String::from("imscp"),
            database_user: String::from("imscp_user"),
            database_password: String::new(),
            timezone: String::from(FALLBACK_TIMEZONE),
            user_initial_lang: String::from("auto"),
            user_initial_theme: String::from("default"),
            layout_color: String::from("black"),
            compress_output: true,
            show_compression_size: true,
            latest_database_revision: 0,
            init_scope: InitScope::Process,
            log_filter: default_log_filter().to_owned(),
            log_format: default_log_format(),
        }
    }
}

impl PanelConfig {
    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Initialization guard scope.
    #[must_use]
    pub const fn init_scope(&self) -> InitScope {
        self.init_scope
    }

    /// Derives the filesystem layout used during bootstrap.
    #[must_use]
    pub fn paths(&self) -> PanelPaths {
        PanelPaths::from_config(self)
    }
}
