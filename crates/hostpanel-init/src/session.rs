//! File-backed sessions.
//!
//! Each session is one JSON object stored as `sess_<id>` in the session
//! directory. The identifier travels in the [`SESSION_COOKIE`] cookie and is
//! validated before it is ever joined to a path. Expiry is judged from the
//! file modification time, which every save refreshes.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write as _};
use std::time::{Duration, SystemTime};

use camino::{Utf8Path, Utf8PathBuf};
use rand::Rng;
use serde_json::Value;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::EnvironmentError;

const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");
const FILE_PREFIX: &str = "sess_";
const MAX_ID_LEN: usize = 128;

/// Cookie carrying the session identifier.
pub const SESSION_COOKIE: &str = "iMSCP_Session";

/// Errors raised by the session store.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A session file could not be read, written or removed.
    #[error("session I/O failed for '{path}': {source}")]
    Io {
        /// File involved.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Session data could not be encoded as JSON.
    #[error("session file '{path}' could not be encoded: {source}")]
    Corrupt {
        /// File involved.
        path: Utf8PathBuf,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
}

/// Options applied to the session store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Cookie name.
    pub name: String,
    /// Directory holding session files.
    pub save_path: Utf8PathBuf,
    /// Identifiers are accepted from cookies only.
    pub use_only_cookies: bool,
    /// Identifiers are never appended to URLs.
    pub use_trans_sid: bool,
    /// Denominator of the garbage collection probability.
    pub gc_divisor: u32,
    /// Numerator of the garbage collection probability.
    pub gc_probability: u32,
    /// Idle time after which a session expires.
    pub gc_maxlifetime: Duration,
}

impl SessionOptions {
    /// Default options for sessions stored under `save_path`.
    #[must_use]
    pub fn new(save_path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            name: SESSION_COOKIE.to_owned(),
            save_path: save_path.into(),
            use_only_cookies: true,
            use_trans_sid: false,
            gc_divisor: 100,
            gc_probability: 1,
            gc_maxlifetime: Duration::from_secs(1440),
        }
    }
}

/// One started session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    id: String,
    data: BTreeMap<String, Value>,
    is_new: bool,
}

impl Session {
    /// Creates an unsaved session with a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            data: BTreeMap::new(),
            is_new: true,
        }
    }

    /// Session identifier, to be sent back in the cookie.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns `true` when the session was created by this request.
    #[must_use]
    pub const fn is_new(&self) -> bool {
        self.is_new
    }

    /// Raw value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Returns `true` when `key` is set.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Text stored under `key`; numbers are rendered.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<String> {
        match self.data.get(key)? {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Text stored under `key`, dropping empty strings.
    #[must_use]
    pub fn non_empty_text(&self, key: &str) -> Option<String> {
        self.text(key).filter(|text| !text.is_empty())
    }

    /// Integer stored under `key`; numeric strings are accepted.
    #[must_use]
    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.data.get(key)? {
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.trim().parse().ok(),
            Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Stores `value` under `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// Removes `key`, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// Identifier of the logged-in user.
    #[must_use]
    pub fn user_id(&self) -> Option<i64> {
        self.integer("user_id")
    }

    /// Returns `true` when another account is acting as this user.
    #[must_use]
    pub fn is_impersonated(&self) -> bool {
        self.contains("logged_from") || self.contains("logged_from_id")
    }

    /// Role of the impersonating account, if any.
    #[must_use]
    pub fn logged_from_type(&self) -> Option<String> {
        self.non_empty_text("logged_from_type")
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Directory of session files.
#[derive(Debug, Clone)]
pub struct SessionStore {
    options: SessionOptions,
}

impl SessionStore {
    /// Opens the store after checking the directory accepts new files.
    ///
    /// # Errors
    ///
    /// Returns [`EnvironmentError::SessionDirectoryNotWritable`] when a probe
    /// file cannot be created in the directory.
    pub fn open(options: SessionOptions) -> Result<Self, EnvironmentError> {
        NamedTempFile::new_in(&options.save_path).map_err(|source| {
            EnvironmentError::SessionDirectoryNotWritable {
                path: options.save_path.clone(),
                source,
            }
        })?;
        Ok(Self { options })
    }

    /// Starts a session for the presented cookie value.
    ///
    /// Runs garbage collection with the configured probability first. The
    /// cookie's session is resumed when it names a live session file;
    /// otherwise, or when the file does not decode, a new session with a
    /// fresh identifier is returned.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] when an existing session file cannot be
    /// read.
    pub fn start(&self, cookie: Option<&str>) -> Result<Session, SessionError> {
        if self.should_collect(&mut rand::thread_rng()) {
            self.collect_garbage(SystemTime::now())?;
        }
        self.resume_or_create(cookie, SystemTime::now())
    }

    fn should_collect(&self, rng: &mut impl Rng) -> bool {
        let divisor = self.options.gc_divisor.max(1);
        rng.gen_range(0..divisor) < self.options.gc_probability
    }

    fn resume_or_create(
        &self,
        cookie: Option<&str>,
        now: SystemTime,
    ) -> Result<Session, SessionError> {
        let Some(id) = cookie.filter(|id| is_valid_id(id)) else {
            if let Some(rejected) = cookie {
                warn!(
                    target: SESSION_TARGET,
                    length = rejected.len(),
                    "ignoring malformed session identifier"
                );
            }
            return Ok(Session::new());
        };

        let path = self.file(id);
        let modified = match fs::metadata(&path).and_then(|meta| meta.modified()) {
            Ok(modified) => modified,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Session::new()),
            Err(source) => return Err(SessionError::Io { path, source }),
        };
        if self.is_expired(modified, now) {
            debug!(target: SESSION_TARGET, "session expired; starting a new one");
            remove_if_present(&path)?;
            return Ok(Session::new());
        }

        let raw = fs::read(&path).map_err(|source| SessionError::Io {
            path: path.clone(),
            source,
        })?;
        let data = if raw.is_empty() {
            BTreeMap::new()
        } else {
            match serde_json::from_slice(&raw) {
                Ok(data) => data,
                Err(error) => {
                    warn!(
                        target: SESSION_TARGET,
                        %error,
                        "discarding undecodable session data"
                    );
                    remove_if_present(&path)?;
                    return Ok(Session::new());
                }
            }
        };
        Ok(Session {
            id: id.to_owned(),
            data,
            is_new: false,
        })
    }

    /// Persists the session atomically.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] when the file cannot be written.
    pub fn save(&self, session: &Session) -> Result<(), SessionError> {
        let path = self.file(&session.id);
        let io_error = |source| SessionError::Io {
            path: path.clone(),
            source,
        };
        let mut file = NamedTempFile::new_in(&self.options.save_path).map_err(io_error)?;
        serde_json::to_writer(&mut file, &session.data).map_err(|source| SessionError::Corrupt {
            path: path.clone(),
            source,
        })?;
        file.flush().map_err(io_error)?;
        file.persist(&path).map_err(|error| io_error(error.error))?;
        Ok(())
    }

    /// Deletes the session file.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] when the file exists but cannot be removed.
    pub fn destroy(&self, session: Session) -> Result<(), SessionError> {
        remove_if_present(&self.file(&session.id))
    }

    /// Removes session files idle for longer than the configured lifetime.
    ///
    /// Returns the number of removed sessions.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] when the directory cannot be listed.
    pub fn collect_garbage(&self, now: SystemTime) -> Result<usize, SessionError> {
        let dir = &self.options.save_path;
        let entries = fs::read_dir(dir).map_err(|source| SessionError::Io {
            path: dir.clone(),
            source,
        })?;
        let mut removed = 0_usize;
        for entry in entries.flatten() {
            let is_session = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(FILE_PREFIX));
            if !is_session {
                continue;
            }
            let Ok(modified) = entry.metadata().and_then(|meta| meta.modified()) else {
                continue;
            };
            if self.is_expired(modified, now) && fs::remove_file(entry.path()).is_ok() {
                removed = removed.saturating_add(1);
            }
        }
        if removed > 0 {
            debug!(target: SESSION_TARGET, removed, "collected expired sessions");
        }
        Ok(removed)
    }

    fn is_expired(&self, modified: SystemTime, now: SystemTime) -> bool {
        now.duration_since(modified)
            .is_ok_and(|idle| idle > self.options.gc_maxlifetime)
    }

    fn file(&self, id: &str) -> Utf8PathBuf {
        self.options.save_path.join(format!("{FILE_PREFIX}{id}"))
    }
}

fn remove_if_present(path: &Utf8Path) -> Result<(), SessionError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(SessionError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Accepts identifiers made of ASCII alphanumerics, `-` and `,`.
fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || byte == b'-' || byte == b',')
}
