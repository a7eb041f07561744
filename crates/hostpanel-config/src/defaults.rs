/// Default root of the web interface.
pub const DEFAULT_GUI_ROOT_DIR: &str = "/var/www/imscp/gui";

/// Default directory holding trusted local configuration.
pub const DEFAULT_CONF_DIR: &str = "/etc/imscp";

/// Default cache directory.
pub const DEFAULT_CACHE_DIR: &str = "/var/www/imscp/gui/data/cache";

/// Default plugin directory.
pub const DEFAULT_PLUGINS_DIR: &str = "/var/www/imscp/gui/plugins";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Locale every resolution falls back to.
pub const FALLBACK_LOCALE: &str = "en_GB";

/// Timezone applied when the configured one is empty or invalid.
pub const FALLBACK_TIMEZONE: &str = "UTC";

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}
