//! In-memory database double and a connector handing it out.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use hostpanel_config::ConfigOverlay;

use crate::database::{Credentials, Database, DatabaseConnector, DatabaseError, GuiProps, ServerIp};

/// Database double with shared query counters.
///
/// Clones share their counters, so a test can keep a handle while the
/// connector hands boxed clones to the runtime.
#[derive(Debug, Clone, Default)]
pub struct FakeDatabase {
    overlay: ConfigOverlay,
    failure: Option<String>,
    gui_props: BTreeMap<i64, GuiProps>,
    plugin_errors: Vec<(String, String)>,
    reseller_ips: BTreeMap<i64, Vec<i64>>,
    server_ips: BTreeMap<i64, String>,
    domains: BTreeMap<(i64, i64), Vec<String>>,
    aliases: BTreeMap<(i64, i64), Vec<String>>,
    overlay_queries: Arc<AtomicUsize>,
    gui_props_queries: Arc<AtomicUsize>,
}

impl FakeDatabase {
    /// Database whose `config` table holds `overlay`.
    #[must_use]
    pub fn with_overlay(overlay: ConfigOverlay) -> Self {
        Self {
            overlay,
            ..Self::default()
        }
    }

    /// Database failing every query with `message`.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_owned()),
            ..Self::default()
        }
    }

    /// Stores preferences for `user_id`; `None` leaves the user without a row.
    #[must_use]
    pub fn with_gui_props(mut self, user_id: i64, props: Option<GuiProps>) -> Self {
        match props {
            Some(props) => self.gui_props.insert(user_id, props),
            None => self.gui_props.remove(&user_id),
        };
        self
    }

    /// Records an error flag for a plugin.
    #[must_use]
    pub fn with_plugin_error(mut self, name: &str, message: &str) -> Self {
        self.plugin_errors.push((name.to_owned(), message.to_owned()));
        self
    }

    /// Assigns IP ids to a reseller.
    #[must_use]
    pub fn with_reseller_ips(mut self, reseller_id: i64, ip_ids: &[i64]) -> Self {
        self.reseller_ips.insert(reseller_id, ip_ids.to_vec());
        self
    }

    /// Adds a server IP.
    #[must_use]
    pub fn with_server_ip(mut self, ip_id: i64, number: &str) -> Self {
        self.server_ips.insert(ip_id, number.to_owned());
        self
    }

    /// Adds domains created by `reseller_id` on `ip_id`.
    #[must_use]
    pub fn with_domains(mut self, ip_id: i64, reseller_id: i64, names: &[&str]) -> Self {
        self.domains
            .insert((ip_id, reseller_id), names.iter().map(|&name| name.to_owned()).collect());
        self
    }

    /// Adds domain aliases created by `reseller_id` on `ip_id`.
    #[must_use]
    pub fn with_aliases(mut self, ip_id: i64, reseller_id: i64, names: &[&str]) -> Self {
        self.aliases
            .insert((ip_id, reseller_id), names.iter().map(|&name| name.to_owned()).collect());
        self
    }

    /// Number of `config` table reads so far.
    #[must_use]
    pub fn overlay_queries(&self) -> usize {
        self.overlay_queries.load(Ordering::SeqCst)
    }

    /// Number of preference reads so far.
    #[must_use]
    pub fn gui_props_queries(&self) -> usize {
        self.gui_props_queries.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), DatabaseError> {
        match &self.failure {
            Some(message) => Err(DatabaseError::Unavailable {
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl Database for FakeDatabase {
    fn config_overlay(&self) -> Result<ConfigOverlay, DatabaseError> {
        self.overlay_queries.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.overlay.clone())
    }

    fn user_gui_props(&self, user_id: i64) -> Result<Option<GuiProps>, DatabaseError> {
        self.gui_props_queries.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.gui_props.get(&user_id).cloned())
    }

    fn plugin_errors(&self) -> Result<Vec<(String, String)>, DatabaseError> {
        self.check()?;
        Ok(self.plugin_errors.clone())
    }

    fn reseller_ip_ids(&self, reseller_id: i64) -> Result<Vec<i64>, DatabaseError> {
        self.check()?;
        Ok(self.reseller_ips.get(&reseller_id).cloned().unwrap_or_default())
    }

    fn server_ips(&self, ids: &[i64]) -> Result<Vec<ServerIp>, DatabaseError> {
        self.check()?;
        Ok(self
            .server_ips
            .iter()
            .filter(|(id, _)| ids.contains(*id))
            .map(|(&id, number)| ServerIp {
                id,
                number: number.clone(),
            })
            .collect())
    }

    fn domains_on_ip(&self, ip_id: i64, reseller_id: i64) -> Result<Vec<String>, DatabaseError> {
        self.check()?;
        Ok(self.domains.get(&(ip_id, reseller_id)).cloned().unwrap_or_default())
    }

    fn aliases_on_ip(&self, ip_id: i64, reseller_id: i64) -> Result<Vec<String>, DatabaseError> {
        self.check()?;
        Ok(self.aliases.get(&(ip_id, reseller_id)).cloned().unwrap_or_default())
    }
}

/// Connector returning clones of a [`FakeDatabase`].
#[derive(Debug, Clone, Default)]
pub struct FakeConnector {
    database: FakeDatabase,
    refuse: Option<String>,
    connections: Arc<Mutex<Vec<String>>>,
}

impl FakeConnector {
    /// Connector handing out `database`.
    #[must_use]
    pub fn new(database: FakeDatabase) -> Self {
        Self {
            database,
            ..Self::default()
        }
    }

    /// Connector refusing every connection with `message`.
    #[must_use]
    pub fn refusing(message: &str) -> Self {
        Self {
            refuse: Some(message.to_owned()),
            ..Self::default()
        }
    }

    /// Database handed to the runtime.
    #[must_use]
    pub const fn database(&self) -> &FakeDatabase {
        &self.database
    }

    /// Decrypted passwords seen by successful and failed connection attempts.
    #[must_use]
    pub fn passwords(&self) -> Vec<String> {
        self.connections.lock().expect("connector mutex poisoned").clone()
    }
}

impl DatabaseConnector for FakeConnector {
    fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Database>, DatabaseError> {
        self.connections
            .lock()
            .expect("connector mutex poisoned")
            .push(credentials.password().to_owned());
        match &self.refuse {
            Some(message) => Err(DatabaseError::Unavailable {
                message: message.clone(),
            }),
            None => Ok(Box::new(self.database.clone())),
        }
    }
}
