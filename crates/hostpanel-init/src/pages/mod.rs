//! Page handlers built on an initialized [`PanelRuntime`](crate::PanelRuntime).
//!
//! Handlers write through the [`Template`] seam; the rendering engine lives
//! outside this crate.

mod ip_usage;

use thiserror::Error;

use crate::database::DatabaseError;
use crate::identity::Role;

pub use self::ip_usage::{IP_USAGE_EMPTY_MESSAGE, render_ip_usage};

/// Variable-and-block template interface used by page handlers.
pub trait Template {
    /// Sets a template variable.
    fn assign(&mut self, name: &str, value: &str);

    /// Renders `block` into the variable `target`, replacing its content.
    fn parse(&mut self, target: &str, block: &str);

    /// Renders `block` and appends it to the variable `target`.
    fn append(&mut self, target: &str, block: &str);
}

/// Result of running a page handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page was rendered.
    Rendered {
        /// Message to show above the page content.
        message: Option<String>,
    },
    /// A hook asked for a redirect before rendering.
    Redirect {
        /// Redirect target.
        location: String,
        /// Message to flash on the target page.
        message: String,
    },
}

/// Errors raised by page handlers.
#[derive(Debug, Error)]
pub enum PageError {
    /// The identity lacks the role the page requires.
    #[error("page requires the {required} role, not {actual}")]
    Forbidden {
        /// Role the page is restricted to.
        required: Role,
        /// Role of the requesting identity.
        actual: Role,
    },
    /// The runtime has no database connection.
    #[error("no database connection available")]
    NotConnected,
    /// A page query failed.
    #[error(transparent)]
    Database(#[from] DatabaseError),
}
