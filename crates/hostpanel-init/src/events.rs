//! Typed lifecycle events and the hooks the bootstrap registers on them.
//!
//! The page layer raises events through [`PanelRuntime::dispatch`]; hooks
//! registered during bootstrap see the merged configuration, the session and
//! the identity, and answer with a [`HookOutcome`] the caller acts on.
//!
//! [`PanelRuntime::dispatch`]: crate::PanelRuntime::dispatch

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use camino::Utf8PathBuf;
use hostpanel_config::{ConfigStore, PanelPaths};
use tracing::{debug, info};

use crate::context::Context;
use crate::identity::{Identity, Role};
use crate::locale::Translator;
use crate::session::Session;

const EVENTS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::events");

/// Redirect target for logins refused during maintenance.
pub const MAINTENANCE_REDIRECT: &str = "index.php?admin=1";

/// Message shown with [`MAINTENANCE_REDIRECT`].
pub const MAINTENANCE_MESSAGE: &str =
    "Only administrators can login when maintenance mode is activated.";

/// Lifecycle events raised by the page layer and the bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Event {
    /// The login page starts.
    LoginScriptStart,
    /// The login page finished.
    LoginScriptEnd,
    /// The lost-password page finished.
    LostPasswordScriptEnd,
    /// An administrator page starts.
    AdminScriptStart,
    /// An administrator page finished.
    AdminScriptEnd,
    /// A reseller page starts.
    ResellerScriptStart,
    /// A reseller page finished.
    ResellerScriptEnd,
    /// A client page starts.
    ClientScriptStart,
    /// A client page finished.
    ClientScriptEnd,
    /// An identity is about to be set.
    BeforeSetIdentity,
    /// An identity was set.
    AfterSetIdentity,
    /// The bootstrap completed.
    AfterInitialize,
}

impl Event {
    /// Role whose navigation a script-start event loads.
    #[must_use]
    pub const fn navigation_role(self) -> Option<&'static str> {
        match self {
            Self::AdminScriptStart => Some("admin"),
            Self::ResellerScriptStart => Some("reseller"),
            Self::ClientScriptStart => Some("client"),
            _ => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, formatter)
    }
}

/// What a hook asks the caller to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// Nothing to do.
    Continue,
    /// Render the layout with this colour.
    Layout {
        /// Layout colour.
        color: String,
    },
    /// Build the menu from this navigation file.
    Navigation {
        /// Navigation definition.
        path: Utf8PathBuf,
    },
    /// Stop and redirect the client.
    Redirect {
        /// Redirect target.
        location: String,
        /// Message to flash on the target page.
        message: String,
    },
}

/// Reports whether the database schema lags behind this build.
pub trait UpdateProbe: Send + Sync {
    /// Returns `true` when a schema update is pending.
    fn update_available(&self, config: &ConfigStore) -> bool;
}

/// Compares the database `database_revision` with `latest_database_revision`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RevisionProbe;

impl UpdateProbe for RevisionProbe {
    fn update_available(&self, config: &ConfigStore) -> bool {
        let current = config.integer("database_revision").unwrap_or(0);
        let latest = config.integer("latest_database_revision").unwrap_or(0);
        current < latest
    }
}

/// Callback registered by the caller.
pub type HookCallback = Arc<dyn Fn(&mut EventContext<'_>) -> HookOutcome + Send + Sync>;

/// State visible to hooks during a dispatch.
pub struct EventContext<'a> {
    /// Event being dispatched.
    pub event: Event,
    /// Context the runtime was bootstrapped for.
    pub context: Context,
    /// Merged configuration.
    pub config: &'a mut ConfigStore,
    /// Session, for browser contexts.
    pub session: Option<&'a mut Session>,
    /// Identity supplied by the caller.
    pub identity: Option<&'a Identity>,
    /// Filesystem layout.
    pub paths: &'a PanelPaths,
    /// Translator, once localization ran.
    pub translator: Option<&'a Translator>,
}

impl EventContext<'_> {
    fn translate<'m>(&'m self, msgid: &'m str) -> String {
        self.translator
            .map_or(msgid, |translator| translator.translate(msgid))
            .to_owned()
    }
}

/// Hooks the bootstrap knows how to register.
#[derive(Clone)]
pub enum Hook {
    /// Resolves the layout colour.
    InitLayout,
    /// Drops the theme colour of a session that was not logged in.
    ResetThemeColor,
    /// Resolves the navigation file of the page's role.
    LoadNavigation,
    /// Enables maintenance mode while a schema update is pending.
    CheckDatabaseUpdate(Arc<dyn UpdateProbe>),
    /// Caller-supplied behaviour.
    Callback(HookCallback),
}

/// Discriminant of a [`Hook`], for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// [`Hook::InitLayout`].
    InitLayout,
    /// [`Hook::ResetThemeColor`].
    ResetThemeColor,
    /// [`Hook::LoadNavigation`].
    LoadNavigation,
    /// [`Hook::CheckDatabaseUpdate`].
    CheckDatabaseUpdate,
    /// [`Hook::Callback`].
    Callback,
}

impl Hook {
    /// Discriminant of this hook.
    #[must_use]
    pub const fn kind(&self) -> HookKind {
        match self {
            Self::InitLayout => HookKind::InitLayout,
            Self::ResetThemeColor => HookKind::ResetThemeColor,
            Self::LoadNavigation => HookKind::LoadNavigation,
            Self::CheckDatabaseUpdate(_) => HookKind::CheckDatabaseUpdate,
            Self::Callback(_) => HookKind::Callback,
        }
    }

    fn run(&self, cx: &mut EventContext<'_>) -> HookOutcome {
        match self {
            Self::InitLayout => {
                let color = cx
                    .session
                    .as_deref()
                    .and_then(|session| session.non_empty_text("user_theme_color"))
                    .or_else(|| cx.config.non_empty_text("layout_color"))
                    .unwrap_or_else(|| "black".to_owned());
                HookOutcome::Layout { color }
            }
            Self::ResetThemeColor => {
                if let Some(session) = cx.session.as_deref_mut() {
                    session.remove("user_theme_color");
                }
                HookOutcome::Continue
            }
            Self::LoadNavigation => cx.event.navigation_role().map_or(
                HookOutcome::Continue,
                |role| HookOutcome::Navigation {
                    path: cx.paths.navigation(role),
                },
            ),
            Self::CheckDatabaseUpdate(probe) => check_database_update(probe.as_ref(), cx),
            Self::Callback(callback) => callback(cx),
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.kind(), formatter)
    }
}

fn check_database_update(probe: &dyn UpdateProbe, cx: &mut EventContext<'_>) -> HookOutcome {
    if !probe.update_available(cx.config) {
        return HookOutcome::Continue;
    }
    cx.config.set("maintenancemode", true);
    info!(
        target: EVENTS_TARGET,
        event = %cx.event,
        "database update pending; maintenance mode enabled"
    );

    let Some(identity) = cx.identity else {
        return HookOutcome::Continue;
    };
    let impersonated_by_admin = cx
        .session
        .as_deref()
        .and_then(Session::logged_from_type)
        .is_some_and(|role| role == Role::Admin.as_str());
    if identity.is_admin() || impersonated_by_admin {
        return HookOutcome::Continue;
    }
    HookOutcome::Redirect {
        location: MAINTENANCE_REDIRECT.to_owned(),
        message: cx.translate(MAINTENANCE_MESSAGE),
    }
}

/// Hooks registered per event, run in registration order.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    listeners: BTreeMap<Event, Vec<Hook>>,
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `hook` on every event in `events`.
    pub fn register(&mut self, events: &[Event], hook: &Hook) {
        for event in events {
            self.listeners.entry(*event).or_default().push(hook.clone());
        }
    }

    /// Kinds of the hooks registered on `event`, in order.
    #[must_use]
    pub fn hooks_for(&self, event: Event) -> Vec<HookKind> {
        self.listeners
            .get(&event)
            .map(|hooks| hooks.iter().map(Hook::kind).collect())
            .unwrap_or_default()
    }

    /// Returns `true` when any hook of `kind` is registered.
    #[must_use]
    pub fn has_hook(&self, kind: HookKind) -> bool {
        self.listeners
            .values()
            .flatten()
            .any(|hook| hook.kind() == kind)
    }

    /// Runs the hooks registered on `cx.event`, collecting their outcomes.
    pub fn dispatch(&self, cx: &mut EventContext<'_>) -> Vec<HookOutcome> {
        let Some(hooks) = self.listeners.get(&cx.event) else {
            return Vec::new();
        };
        debug!(
            target: EVENTS_TARGET,
            event = %cx.event,
            hooks = hooks.len(),
            "dispatching event"
        );
        hooks.iter().map(|hook| hook.run(cx)).collect()
    }
}
