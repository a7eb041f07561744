//! Message catalogs and their per-locale cache.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write as _};

use camino::{Utf8Path, Utf8PathBuf};
use hostpanel_config::PanelPaths;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

use super::{LOCALE_TARGET, Locale};

const CACHE_FILE: &str = "catalog.json";

/// Errors raised while loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A catalog file could not be read or written.
    #[error("catalog I/O failed for '{path}': {source}")]
    Io {
        /// File involved.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// A catalog file is not a JSON object of strings.
    #[error("catalog '{path}' is corrupt: {source}")]
    Corrupt {
        /// File involved.
        path: Utf8PathBuf,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
}

impl CatalogError {
    fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Compiled `msgid -> msgstr` table for one locale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    messages: BTreeMap<String, String>,
}

impl Catalog {
    /// Translation of `msgid`, if the catalog has a non-empty one.
    #[must_use]
    pub fn get(&self, msgid: &str) -> Option<&str> {
        self.messages
            .get(msgid)
            .map(String::as_str)
            .filter(|msgstr| !msgstr.is_empty())
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` for an empty catalog.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn read(path: &Utf8Path) -> Result<Self, CatalogError> {
        let raw = fs::read(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&raw).map_err(|source| CatalogError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl<K, V> FromIterator<(K, V)> for Catalog
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            messages: iter
                .into_iter()
                .map(|(msgid, msgstr)| (msgid.into(), msgstr.into()))
                .collect(),
        }
    }
}

/// Translator bound to the resolved locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translator {
    locale: Locale,
    catalog: Catalog,
}

impl Translator {
    /// Pairs a locale with its catalog.
    #[must_use]
    pub const fn new(locale: Locale, catalog: Catalog) -> Self {
        Self { locale, catalog }
    }

    /// Active locale.
    #[must_use]
    pub const fn locale(&self) -> &Locale {
        &self.locale
    }

    /// Loaded catalog.
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Translates `msgid`, echoing it when the catalog has no entry.
    #[must_use]
    pub fn translate<'a>(&'a self, msgid: &'a str) -> &'a str {
        self.catalog.get(msgid).unwrap_or(msgid)
    }
}

/// Per-locale copies of compiled catalogs.
#[derive(Debug, Clone)]
pub struct CatalogCache {
    dir: Utf8PathBuf,
}

impl CatalogCache {
    /// Cache rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cached copy of the catalog for `locale`.
    #[must_use]
    pub fn entry(&self, locale: &Locale) -> Utf8PathBuf {
        self.dir.join(locale.as_str()).join(CACHE_FILE)
    }

    /// Removes every cached catalog.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] when the directory exists but cannot be
    /// removed.
    pub fn clear(&self) -> Result<(), CatalogError> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CatalogError::Io {
                path: self.dir.clone(),
                source,
            }),
        }
    }

    /// Returns the cached catalog, populating the cache from `source` on a
    /// miss. Cache entries never expire.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] when neither the cache nor the source can
    /// be read. A failure to populate the cache is only logged.
    pub fn load(&self, locale: &Locale, source: &Utf8Path) -> Result<Catalog, CatalogError> {
        let entry = self.entry(locale);
        match Catalog::read(&entry) {
            Ok(catalog) => return Ok(catalog),
            Err(error) if error.is_not_found() => {}
            Err(error) => warn!(target: LOCALE_TARGET, %error, "ignoring cached catalog"),
        }
        let catalog = Catalog::read(source)?;
        if let Err(error) = self.store(&entry, &catalog) {
            warn!(target: LOCALE_TARGET, %error, "couldn't cache the catalog");
        }
        Ok(catalog)
    }

    fn store(&self, entry: &Utf8Path, catalog: &Catalog) -> Result<(), CatalogError> {
        let dir = entry.parent().unwrap_or(&self.dir);
        let io_error = |source| CatalogError::Io {
            path: entry.to_path_buf(),
            source,
        };
        fs::create_dir_all(dir).map_err(io_error)?;
        let mut file = NamedTempFile::new_in(dir).map_err(io_error)?;
        serde_json::to_writer(&mut file, catalog).map_err(|source| CatalogError::Corrupt {
            path: entry.to_path_buf(),
            source,
        })?;
        file.flush().map_err(io_error)?;
        file.persist(entry).map_err(|error| io_error(error.error))?;
        Ok(())
    }
}

/// Loads the translator for `locale`.
///
/// Debug mode clears the whole translation cache and reads the compiled
/// catalog directly. Missing or unreadable catalogs yield an empty catalog,
/// so every message echoes its msgid.
#[must_use]
pub fn load_translator(paths: &PanelPaths, locale: Locale, debug: bool) -> Translator {
    let source = paths.catalog(locale.as_str());
    let cache = CatalogCache::new(paths.translation_cache_dir());
    let loaded = if debug {
        if let Err(error) = cache.clear() {
            warn!(target: LOCALE_TARGET, %error, "couldn't clear the translation cache");
        }
        Catalog::read(&source)
    } else {
        cache.load(&locale, &source)
    };
    let catalog = match loaded {
        Ok(catalog) => catalog,
        Err(error) if error.is_not_found() => {
            debug!(target: LOCALE_TARGET, locale = %locale, "no catalog installed");
            Catalog::default()
        }
        Err(error) => {
            warn!(target: LOCALE_TARGET, locale = %locale, %error, "unreadable catalog");
            Catalog::default()
        }
    };
    Translator::new(locale, catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::support::PanelSandbox;

    fn french() -> Locale {
        Locale::parse("fr_FR").expect("valid locale")
    }

    #[test]
    fn translations_echo_unknown_messages() {
        let translator = Translator::new(
            french(),
            [("Hello", "Bonjour"), ("Empty", "")].into_iter().collect(),
        );
        assert_eq!(translator.translate("Hello"), "Bonjour");
        assert_eq!(translator.translate("Empty"), "Empty");
        assert_eq!(translator.translate("Unknown"), "Unknown");
        assert_eq!(translator.catalog().len(), 2);
        assert!(!translator.catalog().is_empty());
    }

    #[test]
    fn cache_is_populated_on_first_load() {
        let sandbox = PanelSandbox::new();
        sandbox.install_catalog("fr_FR", &[("Hello", "Bonjour")]);
        let cache = CatalogCache::new(sandbox.paths().translation_cache_dir());

        let translator = load_translator(sandbox.paths(), french(), false);
        assert_eq!(translator.translate("Hello"), "Bonjour");
        assert!(cache.entry(&french()).exists());

        sandbox.install_catalog("fr_FR", &[("Hello", "Salut")]);
        let cached = load_translator(sandbox.paths(), french(), false);
        assert_eq!(cached.translate("Hello"), "Bonjour");
    }

    #[test]
    fn debug_clears_and_bypasses_the_cache() {
        let sandbox = PanelSandbox::new();
        sandbox.install_catalog("fr_FR", &[("Hello", "Bonjour")]);
        load_translator(sandbox.paths(), french(), false);
        sandbox.install_catalog("fr_FR", &[("Hello", "Salut")]);

        let translator = load_translator(sandbox.paths(), french(), true);
        assert_eq!(translator.translate("Hello"), "Salut");
        assert!(!sandbox.paths().translation_cache_dir().exists());
    }

    #[test]
    fn missing_catalogs_degrade_to_empty() {
        let sandbox = PanelSandbox::new();
        let translator = load_translator(sandbox.paths(), Locale::fallback(), false);
        assert!(translator.catalog().is_empty());
        assert_eq!(translator.locale(), &Locale::fallback());
    }

    #[test]
    fn corrupt_catalogs_degrade_to_empty() {
        let sandbox = PanelSandbox::new();
        let path = sandbox.paths().catalog("fr_FR");
        fs::create_dir_all(path.parent().expect("catalog has a parent")).expect("catalog dir");
        fs::write(&path, b"{ not json").expect("write catalog");

        let translator = load_translator(sandbox.paths(), french(), false);
        assert!(translator.catalog().is_empty());
    }
}
