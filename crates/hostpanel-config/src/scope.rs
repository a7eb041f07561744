use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How long a completed bootstrap keeps later bootstraps out.
///
/// `Process` matches one-request-per-process deployments: once any request
/// has initialised the panel, the process refuses a second bootstrap.
/// `Request` suits persistent workers, where each request owns its guard.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum InitScope {
    /// One bootstrap per operating-system process.
    #[default]
    Process,
    /// One bootstrap per caller-owned guard.
    Request,
}

/// Error raised when an initialization scope name is not recognised.
pub type InitScopeParseError = strum::ParseError;
