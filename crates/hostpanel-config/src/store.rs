//! Case-insensitive key-value view over the merged configuration.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::PanelConfig;

/// Scalar configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Free-form text.
    Text(String),
}

impl ConfigValue {
    /// Interprets the value as a flag.
    ///
    /// Text values accept the spellings the database table uses for booleans
    /// (`1`, `true`, `yes`, `on`); anything else is `false`.
    #[must_use]
    pub fn as_flag(&self) -> bool {
        match self {
            Self::Bool(value) => *value,
            Self::Integer(value) => *value != 0,
            Self::Text(value) => matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            ),
        }
    }

    /// Interprets the value as an integer.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Bool(value) => Some(i64::from(*value)),
            Self::Integer(value) => Some(*value),
            Self::Text(value) => value.trim().parse().ok(),
        }
    }

    /// Returns the text when the value is textual.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            Self::Bool(_) | Self::Integer(_) => None,
        }
    }

    fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(flag) => Some(Self::Bool(flag)),
            serde_json::Value::Number(number) => number.as_i64().map(Self::Integer),
            serde_json::Value::String(text) => Some(Self::Text(text)),
            serde_json::Value::Null
            | serde_json::Value::Array(_)
            | serde_json::Value::Object(_) => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(formatter, "{value}"),
            Self::Integer(value) => write!(formatter, "{value}"),
            Self::Text(value) => formatter.write_str(value),
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Settings read from the database `config` table.
///
/// The overlay is what gets cached on disk between requests, so it
/// serialises as a plain JSON object of `name -> value` strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ConfigOverlay {
    entries: BTreeMap<String, String>,
}

impl ConfigOverlay {
    /// Creates an empty overlay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an entry.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), value.into());
    }

    /// Looks up an entry by its exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the overlay holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for ConfigOverlay
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

/// Merged configuration consulted by every bootstrap step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigStore {
    values: BTreeMap<String, ConfigValue>,
}

impl ConfigStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flattens the typed base configuration into a store.
    ///
    /// Only scalar fields are carried over; paths and enums become text.
    #[must_use]
    pub fn from_config(config: &PanelConfig) -> Self {
        let mut store = Self::new();
        if let Ok(serde_json::Value::Object(fields)) = serde_json::to_value(config) {
            for (key, value) in fields {
                if let Some(scalar) = ConfigValue::from_json(value) {
                    store.set(key, scalar);
                }
            }
        }
        store
    }

    /// Looks up a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(&normalise(key))
    }

    /// Returns `true` when the key is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(&normalise(key))
    }

    /// Inserts or replaces a value.
    pub fn set(&mut self, key: impl AsRef<str>, value: impl Into<ConfigValue>) {
        self.values.insert(normalise(key.as_ref()), value.into());
    }

    /// Merges the database overlay, overlay values winning on conflicts.
    pub fn merge(&mut self, overlay: &ConfigOverlay) {
        for (name, value) in overlay.iter() {
            self.set(name, value);
        }
    }

    /// Reads a key as a flag; missing keys are `false`.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(ConfigValue::as_flag)
    }

    /// Reads a key as an integer.
    #[must_use]
    pub fn integer(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(ConfigValue::as_integer)
    }

    /// Reads a key as text, rendering non-text scalars.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key).map(ToString::to_string)
    }

    /// Reads a key as text and drops empty values.
    #[must_use]
    pub fn non_empty_text(&self, key: &str) -> Option<String> {
        self.text(key).filter(|value| !value.trim().is_empty())
    }

    /// Shortcut for the `debug` flag.
    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.flag("debug")
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn normalise(key: &str) -> String {
    key.trim().to_ascii_lowercase()
}
