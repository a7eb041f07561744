//! Database access used by the bootstrap steps and page handlers.
//!
//! Steps never talk to a driver directly. They go through [`Database`], which
//! exposes exactly the queries the initializer and the bundled pages issue,
//! and obtain it from a [`DatabaseConnector`]. The production pair is
//! [`SqliteConnector`] and the connection it opens; tests substitute
//! in-memory doubles.

mod keys;
mod sqlite;

use std::fmt;

use hostpanel_config::{ConfigOverlay, ConfigStore};
use thiserror::Error;

pub use keys::{KeyMaterial, KeyMaterialError};
pub use sqlite::{SqliteConnector, SqliteDatabase};

/// Errors raised by database drivers.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The configured driver is not compiled in.
    #[error("unsupported database driver '{driver}'")]
    UnsupportedDriver {
        /// Configured driver name.
        driver: String,
    },
    /// `SQLite` reported an error.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    /// The backend cannot serve the request.
    #[error("database unavailable: {message}")]
    Unavailable {
        /// Backend-specific description.
        message: String,
    },
}

/// Decrypted connection parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    driver: String,
    host: String,
    name: String,
    user: String,
    password: String,
}

impl Credentials {
    /// Reads the connection settings from the store, pairing them with the
    /// already decrypted password.
    #[must_use]
    pub fn from_store(config: &ConfigStore, password: String) -> Self {
        let setting = |key: &str| config.text(key).unwrap_or_default();
        Self {
            driver: setting("database_type"),
            host: setting("database_host"),
            name: setting("database_name"),
            user: setting("database_user"),
            password,
        }
    }

    /// Driver name, for example `sqlite`.
    #[must_use]
    pub fn driver(&self) -> &str {
        &self.driver
    }

    /// Server host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Database name or file.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Account name.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Plain-text password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Stored interface preferences of one user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuiProps {
    /// Preferred language, possibly empty.
    pub lang: Option<String>,
    /// Preferred theme, possibly empty.
    pub layout: Option<String>,
}

/// Server IP address row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerIp {
    /// Row identifier.
    pub id: i64,
    /// Address in textual form.
    pub number: String,
}

/// Queries issued during bootstrap and by page handlers.
pub trait Database: Send {
    /// Reads every row of the `config` table.
    ///
    /// # Errors
    ///
    /// Returns a [`DatabaseError`] when the query fails.
    fn config_overlay(&self) -> Result<ConfigOverlay, DatabaseError>;

    /// Reads the interface preferences of `user_id`.
    ///
    /// # Errors
    ///
    /// Returns a [`DatabaseError`] when the query fails.
    fn user_gui_props(&self, user_id: i64) -> Result<Option<GuiProps>, DatabaseError>;

    /// Reads the `(plugin_name, plugin_error)` pairs of errored plugins.
    ///
    /// # Errors
    ///
    /// Returns a [`DatabaseError`] when the query fails.
    fn plugin_errors(&self) -> Result<Vec<(String, String)>, DatabaseError>;

    /// Reads the IP ids assigned to a reseller.
    ///
    /// # Errors
    ///
    /// Returns a [`DatabaseError`] when the query fails.
    fn reseller_ip_ids(&self, reseller_id: i64) -> Result<Vec<i64>, DatabaseError>;

    /// Reads the server IPs with the given ids, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns a [`DatabaseError`] when the query fails.
    fn server_ips(&self, ids: &[i64]) -> Result<Vec<ServerIp>, DatabaseError>;

    /// Names of the domains on `ip_id` created by `reseller_id`, sorted.
    ///
    /// # Errors
    ///
    /// Returns a [`DatabaseError`] when the query fails.
    fn domains_on_ip(&self, ip_id: i64, reseller_id: i64) -> Result<Vec<String>, DatabaseError>;

    /// Names of the domain aliases on `ip_id` whose parent domain was
    /// created by `reseller_id`, sorted.
    ///
    /// # Errors
    ///
    /// Returns a [`DatabaseError`] when the query fails.
    fn aliases_on_ip(&self, ip_id: i64, reseller_id: i64) -> Result<Vec<String>, DatabaseError>;
}

/// Opens database connections.
pub trait DatabaseConnector {
    /// Connects with the given credentials.
    ///
    /// # Errors
    ///
    /// Returns a [`DatabaseError`] when the connection cannot be established.
    fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Database>, DatabaseError>;
}

/// Parses the `;`-separated id list stored in `reseller_props.reseller_ips`.
pub(crate) fn parse_id_list(raw: &str) -> Vec<i64> {
    raw.split(';')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .filter_map(|id| id.parse().ok())
        .collect()
}
