use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Log output formats supported by the initializer binary.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event, for log shippers.
    #[default]
    Json,
    /// Single-line human-readable events.
    Compact,
}

/// Error raised when a log format name is not recognised.
pub type LogFormatParseError = strum::ParseError;
