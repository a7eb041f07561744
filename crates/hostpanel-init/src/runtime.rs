//! Context object produced by the bootstrap and handed to page handlers.

use std::fmt;
use std::io;

use hostpanel_config::{ConfigStore, PanelConfig, PanelPaths};
use hostpanel_plugins::LoadedPlugin;

use crate::context::{Context, RequestEnvironment};
use crate::database::Database;
use crate::events::{Event, EventBus, EventContext, Hook, HookOutcome};
use crate::identity::Identity;
use crate::locale::{Locale, Translator};
use crate::output::{FilteredBody, GzipFilter};
use crate::overlay::OverlaySource;
use crate::response::{ErrorDisplay, ResponseDefaults};
use crate::session::{Session, SessionError, SessionStore};

/// Everything a request needs once the panel is initialized.
///
/// Components produced by steps that did not run for the context stay
/// empty: a command-line runtime has no session and no output filter.
pub struct PanelRuntime {
    pub(crate) context: Context,
    pub(crate) config: ConfigStore,
    pub(crate) paths: PanelPaths,
    pub(crate) error_display: ErrorDisplay,
    pub(crate) response: ResponseDefaults,
    pub(crate) session_store: Option<SessionStore>,
    pub(crate) session: Option<Session>,
    pub(crate) database: Option<Box<dyn Database>>,
    pub(crate) overlay_source: Option<OverlaySource>,
    pub(crate) translator: Option<Translator>,
    pub(crate) events: EventBus,
    pub(crate) output: Option<GzipFilter>,
    pub(crate) plugins: Vec<LoadedPlugin>,
}

impl PanelRuntime {
    pub(crate) fn new(context: Context, config: &PanelConfig) -> Self {
        Self {
            context,
            config: ConfigStore::from_config(config),
            paths: config.paths(),
            error_display: ErrorDisplay::default(),
            response: ResponseDefaults::default(),
            session_store: None,
            session: None,
            database: None,
            overlay_source: None,
            translator: None,
            events: EventBus::new(),
            output: None,
            plugins: Vec::new(),
        }
    }

    /// Context the runtime was bootstrapped for.
    #[must_use]
    pub const fn context(&self) -> Context {
        self.context
    }

    /// Merged configuration.
    #[must_use]
    pub const fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// Mutable access to the merged configuration.
    pub const fn config_mut(&mut self) -> &mut ConfigStore {
        &mut self.config
    }

    /// Filesystem layout.
    #[must_use]
    pub const fn paths(&self) -> &PanelPaths {
        &self.paths
    }

    /// Error visibility.
    #[must_use]
    pub const fn error_display(&self) -> ErrorDisplay {
        self.error_display
    }

    /// Encoding, charset and timezone.
    #[must_use]
    pub const fn response(&self) -> &ResponseDefaults {
        &self.response
    }

    /// Started session, for browser contexts.
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Mutable access to the session.
    pub const fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    /// Persists the session, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] when the session file cannot be written.
    pub fn save_session(&self) -> Result<(), SessionError> {
        match (&self.session_store, &self.session) {
            (Some(store), Some(session)) => store.save(session),
            _ => Ok(()),
        }
    }

    /// Database connection.
    #[must_use]
    pub fn database(&self) -> Option<&dyn Database> {
        self.database.as_deref()
    }

    /// Where the configuration overlay came from.
    #[must_use]
    pub const fn overlay_source(&self) -> Option<OverlaySource> {
        self.overlay_source
    }

    /// Translator for the resolved locale.
    #[must_use]
    pub const fn translator(&self) -> Option<&Translator> {
        self.translator.as_ref()
    }

    /// Resolved locale.
    #[must_use]
    pub fn locale(&self) -> Option<&Locale> {
        self.translator.as_ref().map(Translator::locale)
    }

    /// Translates `msgid`, echoing it before localization ran.
    #[must_use]
    pub fn translate<'a>(&'a self, msgid: &'a str) -> &'a str {
        self.translator
            .as_ref()
            .map_or(msgid, |translator| translator.translate(msgid))
    }

    /// Registered hooks.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Registers a further hook.
    pub fn register(&mut self, events: &[Event], hook: &Hook) {
        self.events.register(events, hook);
    }

    /// Output filter for rendered pages.
    #[must_use]
    pub const fn output_filter(&self) -> Option<&GzipFilter> {
        self.output.as_ref()
    }

    /// Runs a rendered page through the output filter.
    ///
    /// Without a filter, or when the client does not accept gzip, the body
    /// is passed through unchanged.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] if compression fails.
    pub fn filter_output(
        &self,
        body: &[u8],
        request: &RequestEnvironment,
    ) -> io::Result<FilteredBody> {
        match &self.output {
            Some(filter) => filter.apply(body, request.accept_encoding()),
            None => Ok(FilteredBody {
                bytes: body.to_vec(),
                content_encoding: None,
            }),
        }
    }

    /// Plugins loaded during bootstrap.
    #[must_use]
    pub fn plugins(&self) -> &[LoadedPlugin] {
        &self.plugins
    }

    /// Runs the hooks registered on `event` and returns their outcomes.
    pub fn dispatch(&mut self, event: Event, identity: Option<&Identity>) -> Vec<HookOutcome> {
        let mut cx = EventContext {
            event,
            context: self.context,
            config: &mut self.config,
            session: self.session.as_mut(),
            identity,
            paths: &self.paths,
            translator: self.translator.as_ref(),
        };
        self.events.dispatch(&mut cx)
    }
}

impl fmt::Debug for PanelRuntime {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PanelRuntime")
            .field("context", &self.context)
            .field("error_display", &self.error_display)
            .field("response", &self.response)
            .field("session", &self.session.as_ref().map(Session::id))
            .field("connected", &self.database.is_some())
            .field("overlay_source", &self.overlay_source)
            .field("locale", &self.locale())
            .field("events", &self.events)
            .field("output", &self.output)
            .field("plugins", &self.plugins)
            .finish_non_exhaustive()
    }
}
