//! Database configuration overlay and its on-disk cache.
//!
//! The overlay is read from the `config` table at most once per cache
//! lifetime. Outside debug mode and outside command-line runs the rebuilt
//! overlay is written next to a lock file created with `create_new`, so only
//! one writer publishes at a time, and the cache appears through an atomic
//! rename. A lock older than [`STALE_LOCK_AFTER`] belongs to a writer that
//! died mid-publication and is removed. Debug mode always rebuilds and never
//! writes.

use std::fs::{self, OpenOptions};
use std::io::{self, Write as _};
use std::process;
use std::time::{Duration, SystemTime};

use camino::{Utf8Path, Utf8PathBuf};
use hostpanel_config::{ConfigOverlay, PanelPaths};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

use crate::context::Context;
use crate::database::{Database, DatabaseError};

const OVERLAY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::overlay");

/// Age after which an overlay cache lock is considered abandoned.
pub const STALE_LOCK_AFTER: Duration = Duration::from_secs(60);

/// Errors raised while reading or writing the overlay cache.
#[derive(Debug, Error)]
pub enum ConfigCacheError {
    /// File system access failed.
    #[error("overlay cache I/O failed for '{path}': {source}")]
    Io {
        /// File involved.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The cache file did not decode.
    #[error("overlay cache '{path}' is corrupt: {source}")]
    Corrupt {
        /// Cache file.
        path: Utf8PathBuf,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
}

/// Where an overlay came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlaySource {
    /// Decoded from the cache file.
    Cache,
    /// Queried from the database.
    Database,
}

/// Result of a cache publication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheWrite {
    /// The cache file was replaced.
    Written,
    /// Another writer held the lock.
    Locked,
}

/// Overlay cache rooted at a [`PanelPaths`] layout.
#[derive(Debug, Clone, Copy)]
pub struct OverlayCache<'a> {
    paths: &'a PanelPaths,
}

impl<'a> OverlayCache<'a> {
    /// Cache for the given layout.
    #[must_use]
    pub const fn new(paths: &'a PanelPaths) -> Self {
        Self { paths }
    }

    /// Loads the overlay, preferring the cache.
    ///
    /// # Errors
    ///
    /// Returns the [`DatabaseError`] raised when the overlay has to be
    /// rebuilt and the query fails. Cache problems only produce warnings.
    pub fn load(
        &self,
        database: &dyn Database,
        context: Context,
        debug: bool,
    ) -> Result<(ConfigOverlay, OverlaySource), DatabaseError> {
        if debug {
            self.discard();
        } else {
            match self.read() {
                Ok(Some(overlay)) => return Ok((overlay, OverlaySource::Cache)),
                Ok(None) => {}
                Err(error) => warn!(
                    target: OVERLAY_TARGET,
                    %error,
                    "ignoring unusable overlay cache"
                ),
            }
        }

        let overlay = database.config_overlay()?;
        debug!(
            target: OVERLAY_TARGET,
            entries = overlay.len(),
            "rebuilt configuration overlay from the database"
        );
        if !debug && context.is_http() {
            match self.write(&overlay) {
                Ok(CacheWrite::Written) => {}
                Ok(CacheWrite::Locked) => debug!(
                    target: OVERLAY_TARGET,
                    "overlay cache is being written elsewhere"
                ),
                Err(error) => warn!(
                    target: OVERLAY_TARGET,
                    %error,
                    "couldn't write the overlay cache"
                ),
            }
        }
        Ok((overlay, OverlaySource::Database))
    }

    /// Decodes the cache file when it exists.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigCacheError`] when the file exists but cannot be read
    /// or decoded.
    pub fn read(&self) -> Result<Option<ConfigOverlay>, ConfigCacheError> {
        let path = self.paths.overlay_cache();
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigCacheError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|source| ConfigCacheError::Corrupt {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Publishes the overlay under the exclusive lock.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigCacheError`] when the lock, the temporary file or
    /// the rename fails for a reason other than a concurrent writer.
    pub fn write(&self, overlay: &ConfigOverlay) -> Result<CacheWrite, ConfigCacheError> {
        let path = self.paths.overlay_cache();
        let dir = path.parent().unwrap_or_else(|| Utf8Path::new("."));
        fs::create_dir_all(dir).map_err(|source| io_error(dir, source))?;

        let lock_path = self.paths.overlay_cache_lock();
        let Some(_lock) = CacheLock::acquire(&lock_path)? else {
            return Ok(CacheWrite::Locked);
        };

        let mut file = NamedTempFile::new_in(dir).map_err(|source| io_error(dir, source))?;
        serde_json::to_writer(&mut file, overlay).map_err(|source| ConfigCacheError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;
        file.flush().map_err(|source| io_error(path, source))?;
        file.as_file()
            .sync_all()
            .map_err(|source| io_error(path, source))?;
        file.persist(path)
            .map_err(|error| io_error(path, error.error))?;
        debug!(target: OVERLAY_TARGET, path = %path, "wrote overlay cache");
        Ok(CacheWrite::Written)
    }

    /// Deletes the cache file, logging failures.
    pub fn discard(&self) {
        let path = self.paths.overlay_cache();
        match fs::remove_file(path) {
            Ok(()) => debug!(target: OVERLAY_TARGET, path = %path, "discarded overlay cache"),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => warn!(
                target: OVERLAY_TARGET,
                path = %path,
                %error,
                "couldn't discard the overlay cache"
            ),
        }
    }
}

/// Lock file removed on drop; holds the writer's pid.
struct CacheLock {
    path: Utf8PathBuf,
}

impl CacheLock {
    fn acquire(path: &Utf8Path) -> Result<Option<Self>, ConfigCacheError> {
        match Self::create(path) {
            Ok(lock) => Ok(Some(lock)),
            Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {
                Self::recover_stale(path)
            }
            Err(source) => Err(io_error(path, source)),
        }
    }

    fn create(path: &Utf8Path) -> io::Result<Self> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        let lock = Self {
            path: path.to_path_buf(),
        };
        writeln!(file, "{}", process::id())?;
        Ok(lock)
    }

    fn recover_stale(path: &Utf8Path) -> Result<Option<Self>, ConfigCacheError> {
        let Some(age) = lock_age(path) else {
            return Ok(None);
        };
        if age <= STALE_LOCK_AFTER {
            return Ok(None);
        }
        warn!(
            target: OVERLAY_TARGET,
            path = %path,
            age_secs = age.as_secs(),
            "removing stale overlay cache lock"
        );
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(source) => return Err(io_error(path, source)),
        }
        match Self::create(path) {
            Ok(lock) => Ok(Some(lock)),
            Err(error) if error.kind() == io::ErrorKind::AlreadyExists => Ok(None),
            Err(source) => Err(io_error(path, source)),
        }
    }
}

fn lock_age(path: &Utf8Path) -> Option<Duration> {
    let modified = fs::metadata(path).and_then(|metadata| metadata.modified()).ok()?;
    SystemTime::now().duration_since(modified).ok()
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        if let Err(error) = fs::remove_file(&self.path) {
            warn!(
                target: OVERLAY_TARGET,
                path = %self.path,
                %error,
                "couldn't release the overlay cache lock"
            );
        }
    }
}

fn io_error(path: &Utf8Path, source: io::Error) -> ConfigCacheError {
    ConfigCacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}
