//! Request initializer for the hosting control panel.
//!
//! Every request to the panel, whether a browser page, an AJAX call or a
//! command-line job, is bootstrapped exactly once before any page logic
//! runs. The [`Sequencer`] derives nothing on its own: the caller supplies
//! the request [`Context`] and environment, and the sequencer runs that
//! context's fixed step table against a fresh [`PanelRuntime`]:
//!
//! 1. error display, session and database connection;
//! 2. the database configuration overlay, merged over the base
//!    [`PanelConfig`](hostpanel_config::PanelConfig) through an on-disk cache;
//! 3. encoding, charset, timezone and the user's interface preferences;
//! 4. locale resolution and message catalogs;
//! 5. layout, navigation and maintenance hooks on the typed [`EventBus`];
//! 6. response compression and plugin loading.
//!
//! The first failing step aborts the request with a [`BootstrapError`]. An
//! [`InitState`] guard, scoped per process or per request by configuration,
//! rejects a second bootstrap. Progress is reported through a
//! [`BootstrapReporter`], by default as structured `tracing` events.
//!
//! The [`pages`] module carries the page handlers that consume the runtime.

mod bootstrap;
mod context;
pub mod database;
mod errors;
pub mod events;
mod health;
mod identity;
pub mod locale;
mod output;
mod overlay;
pub mod pages;
mod preferences;
mod response;
mod runtime;
mod session;
mod state;
pub mod telemetry;

pub use bootstrap::{ConfigLoader, Sequencer, StaticConfigLoader, SystemConfigLoader};
pub use context::{Context, RequestEnvironment, Step};
pub use errors::{BootstrapError, EnvironmentError};
pub use events::{Event, EventBus, EventContext, Hook, HookKind, HookOutcome};
pub use health::{BootstrapReporter, StructuredBootstrapReporter};
pub use identity::{Identity, Role};
pub use output::{FilteredBody, GzipFilter};
pub use overlay::{CacheWrite, ConfigCacheError, OverlayCache, OverlaySource, STALE_LOCK_AFTER};
pub use preferences::apply_user_gui_props;
pub use response::{ErrorDisplay, ResponseDefaults, UTF_8};
pub use runtime::PanelRuntime;
pub use session::{SESSION_COOKIE, Session, SessionError, SessionOptions, SessionStore};
pub use state::{InitState, Phase, process_state};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
