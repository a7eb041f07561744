//! `SQLite` implementation of the database seam.

use std::time::Duration;

use hostpanel_config::ConfigOverlay;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params, params_from_iter};
use tracing::debug;

use super::{Credentials, Database, DatabaseConnector, DatabaseError, GuiProps, ServerIp, parse_id_list};

const DATABASE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::database");
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens existing `SQLite` databases named by [`Credentials::name`].
///
/// The file must already exist; a missing database is a connection error,
/// not an invitation to create an empty one. Host, user and password are
/// ignored by this driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteConnector;

impl DatabaseConnector for SqliteConnector {
    fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Database>, DatabaseError> {
        if !credentials.driver().eq_ignore_ascii_case("sqlite") {
            return Err(DatabaseError::UnsupportedDriver {
                driver: credentials.driver().to_owned(),
            });
        }
        let connection = Connection::open_with_flags(
            credentials.name(),
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        connection.busy_timeout(BUSY_TIMEOUT)?;
        debug!(
            target: DATABASE_TARGET,
            database = credentials.name(),
            "connected to database"
        );
        Ok(Box::new(SqliteDatabase::new(connection)))
    }
}

/// Single unpooled `SQLite` connection.
#[derive(Debug)]
pub struct SqliteDatabase {
    connection: Connection,
}

impl SqliteDatabase {
    /// Wraps an open connection.
    #[must_use]
    pub const fn new(connection: Connection) -> Self {
        Self { connection }
    }

    fn names(&self, sql: &str, ip_id: i64, reseller_id: i64) -> Result<Vec<String>, DatabaseError> {
        let mut statement = self.connection.prepare(sql)?;
        let rows = statement.query_map(params![ip_id, reseller_id], |row| row.get(0))?;
        Ok(rows.collect::<Result<_, _>>()?)
    }
}

impl Database for SqliteDatabase {
    fn config_overlay(&self) -> Result<ConfigOverlay, DatabaseError> {
        let mut statement = self.connection.prepare("SELECT name, value FROM config")?;
        let rows = statement.query_map([], |row| {
            let name: String = row.get(0)?;
            let value: Option<String> = row.get(1)?;
            Ok((name, value.unwrap_or_default()))
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    fn user_gui_props(&self, user_id: i64) -> Result<Option<GuiProps>, DatabaseError> {
        let props = self
            .connection
            .query_row(
                "SELECT lang, layout FROM user_gui_props WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(GuiProps {
                        lang: row.get(0)?,
                        layout: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(props)
    }

    fn plugin_errors(&self) -> Result<Vec<(String, String)>, DatabaseError> {
        let mut statement = self.connection.prepare(
            "SELECT plugin_name, plugin_error FROM plugin \
             WHERE plugin_error IS NOT NULL AND plugin_error <> ''",
        )?;
        let rows = statement.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    fn reseller_ip_ids(&self, reseller_id: i64) -> Result<Vec<i64>, DatabaseError> {
        let raw: Option<Option<String>> = self
            .connection
            .query_row(
                "SELECT reseller_ips FROM reseller_props WHERE reseller_id = ?1",
                params![reseller_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw.flatten().as_deref().map(parse_id_list).unwrap_or_default())
    }

    fn server_ips(&self, ids: &[i64]) -> Result<Vec<ServerIp>, DatabaseError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT ip_id, ip_number FROM server_ips WHERE ip_id IN ({placeholders}) ORDER BY ip_id"
        );
        let mut statement = self.connection.prepare(&sql)?;
        let rows = statement.query_map(params_from_iter(ids.iter()), |row| {
            Ok(ServerIp {
                id: row.get(0)?,
                number: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    fn domains_on_ip(&self, ip_id: i64, reseller_id: i64) -> Result<Vec<String>, DatabaseError> {
        self.names(
            "SELECT domain_name FROM domain \
             WHERE domain_ip_id = ?1 AND domain_created_id = ?2 \
             ORDER BY domain_name",
            ip_id,
            reseller_id,
        )
    }

    fn aliases_on_ip(&self, ip_id: i64, reseller_id: i64) -> Result<Vec<String>, DatabaseError> {
        self.names(
            "SELECT alias.alias_name FROM domain_aliasses AS alias \
             INNER JOIN domain ON domain.domain_id = alias.domain_id \
             WHERE alias.alias_ip_id = ?1 AND domain.domain_created_id = ?2 \
             ORDER BY alias.alias_name",
            ip_id,
            reseller_id,
        )
    }
}
