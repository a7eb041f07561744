//! Errors surfaced by the bootstrap sequence.

use std::io;
use std::sync::Arc;

use camino::Utf8PathBuf;
use hostpanel_plugins::PluginError;
use ortho_config::OrthoError;
use thiserror::Error;

use crate::context::Step;
use crate::database::{DatabaseError, KeyMaterialError};
use crate::state::Phase;

/// The host cannot support a bootstrap: filesystem or key material problems.
#[derive(Debug, Error)]
pub enum EnvironmentError {
    /// The session directory refused a probe file.
    #[error("the '{path}' directory must be writable")]
    SessionDirectoryNotWritable {
        /// Session directory.
        path: Utf8PathBuf,
        /// Error raised by the probe.
        #[source]
        source: io::Error,
    },
    /// Database credentials could not be recovered.
    #[error(transparent)]
    KeyMaterial(#[from] KeyMaterialError),
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The initialization guard was already used.
    #[error("the panel is already initialized (state: {phase:?})")]
    AlreadyInitialized {
        /// Phase the guard was found in.
        phase: Phase,
    },
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// The host environment is unusable.
    #[error(transparent)]
    Environment(#[from] EnvironmentError),
    /// The session store failed after the directory check passed.
    #[error("failed to start the session: {source}")]
    Session {
        /// Underlying session error.
        #[source]
        source: crate::session::SessionError,
    },
    /// The database refused the connection.
    #[error("{message}")]
    DatabaseConnection {
        /// Operator-facing message.
        message: String,
        /// Driver error.
        #[source]
        source: DatabaseError,
    },
    /// A query issued by a step failed.
    #[error("database query failed during the {step} step: {source}")]
    Database {
        /// Step that issued the query.
        step: Step,
        /// Driver error.
        #[source]
        source: DatabaseError,
    },
    /// Plugin discovery or loading failed.
    #[error(transparent)]
    PluginLoad(#[from] PluginError),
    /// A step ran before the step producing its input.
    #[error("the {step} step requires {requires}")]
    MissingPrerequisite {
        /// Step that could not run.
        step: Step,
        /// Missing runtime component.
        requires: &'static str,
    },
}

impl BootstrapError {
    /// Builds the connection error with its operator-facing message.
    pub(crate) fn connection(source: DatabaseError) -> Self {
        Self::DatabaseConnection {
            message: format!("Couldn't establish connection to the database: {source}"),
            source,
        }
    }

    /// Name of the plugin that aborted the bootstrap, if any.
    #[must_use]
    pub fn plugin_name(&self) -> Option<&str> {
        match self {
            Self::PluginLoad(PluginError::Load { name, .. }) => Some(name.as_str()),
            _ => None,
        }
    }
}
