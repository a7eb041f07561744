//! Individual bootstrap steps.

use std::sync::Arc;

use hostpanel_plugins::{PluginLoader, PluginManager, PluginRegistry};
use tracing::debug;

use crate::context::{RequestEnvironment, Step};
use crate::database::{Credentials, Database, DatabaseConnector, KeyMaterial};
use crate::errors::{BootstrapError, EnvironmentError};
use crate::events::{Event, Hook, UpdateProbe};
use crate::locale::{self, LocaleRequest};
use crate::output::{DEFAULT_LEVEL, GzipFilter};
use crate::overlay::OverlayCache;
use crate::preferences::apply_user_gui_props;
use crate::response::{ErrorDisplay, UTF_8, resolve_timezone};
use crate::runtime::PanelRuntime;
use crate::session::{SessionOptions, SessionStore};

use super::BOOTSTRAP_TARGET;

const LAYOUT_EVENTS: &[Event] = &[
    Event::LoginScriptEnd,
    Event::LostPasswordScriptEnd,
    Event::AdminScriptEnd,
    Event::ResellerScriptEnd,
    Event::ClientScriptEnd,
];

const NAVIGATION_EVENTS: &[Event] = &[
    Event::AdminScriptStart,
    Event::ResellerScriptStart,
    Event::ClientScriptStart,
];

const UPDATE_CHECK_EVENTS: &[Event] = &[Event::LoginScriptStart, Event::BeforeSetIdentity];

/// Runs steps against the runtime under construction.
pub(super) struct StepRunner<'s, C, L> {
    pub(super) connector: &'s C,
    pub(super) plugin_loader: &'s L,
    pub(super) update_probe: &'s Arc<dyn UpdateProbe>,
    pub(super) request: &'s RequestEnvironment,
    pub(super) runtime: PanelRuntime,
}

impl<C, L> StepRunner<'_, C, L>
where
    C: DatabaseConnector,
    L: PluginLoader + Clone,
{
    pub(super) fn run(&mut self, step: Step) -> Result<(), BootstrapError> {
        match step {
            Step::DisplayErrors => {
                self.runtime.error_display = ErrorDisplay::for_debug(self.runtime.config.is_debug());
                Ok(())
            }
            Step::Session => self.start_session(),
            Step::Database => self.connect(),
            Step::LoadConfig => self.load_config(),
            Step::Encoding => {
                self.runtime.response.set_internal_encoding(UTF_8);
                Ok(())
            }
            Step::Charset => {
                self.runtime.response.set_charset(UTF_8);
                Ok(())
            }
            Step::Timezone => {
                let timezone = resolve_timezone(self.runtime.config.text("timezone").as_deref());
                self.runtime.response.set_timezone(timezone);
                Ok(())
            }
            Step::UserGuiProperties => self.user_gui_properties(),
            Step::Localization => {
                self.localize();
                Ok(())
            }
            Step::Layout => {
                self.register_layout();
                Ok(())
            }
            Step::Navigation => {
                self.runtime
                    .register(NAVIGATION_EVENTS, &Hook::LoadNavigation);
                Ok(())
            }
            Step::OutputBuffering => {
                self.install_output_filter();
                Ok(())
            }
            Step::DatabaseUpdateCheck => {
                let hook = Hook::CheckDatabaseUpdate(Arc::clone(self.update_probe));
                self.runtime.register(UPDATE_CHECK_EVENTS, &hook);
                Ok(())
            }
            Step::Plugins => self.load_plugins(),
        }
    }

    fn start_session(&mut self) -> Result<(), BootstrapError> {
        let options = SessionOptions::new(self.runtime.paths.session_dir());
        let store = SessionStore::open(options)?;
        let session = store
            .start(self.request.session_cookie())
            .map_err(|source| BootstrapError::Session { source })?;
        debug!(
            target: BOOTSTRAP_TARGET,
            resumed = !session.is_new(),
            "session started"
        );
        self.runtime.session = Some(session);
        self.runtime.session_store = Some(store);
        Ok(())
    }

    fn connect(&mut self) -> Result<(), BootstrapError> {
        let keys = KeyMaterial::read(self.runtime.paths.key_material())
            .map_err(EnvironmentError::from)?;
        let ciphertext = self
            .runtime
            .config
            .text("database_password")
            .unwrap_or_default();
        let password = keys
            .decrypt_password(&ciphertext)
            .map_err(EnvironmentError::from)?;
        let credentials = Credentials::from_store(&self.runtime.config, password);
        let database = self
            .connector
            .connect(&credentials)
            .map_err(BootstrapError::connection)?;
        self.runtime.database = Some(database);
        Ok(())
    }

    fn load_config(&mut self) -> Result<(), BootstrapError> {
        let database = database(&self.runtime, Step::LoadConfig)?;
        let debug = self.runtime.config.is_debug();
        let (overlay, source) = OverlayCache::new(&self.runtime.paths)
            .load(database, self.runtime.context, debug)
            .map_err(|source| BootstrapError::Database {
                step: Step::LoadConfig,
                source,
            })?;
        self.runtime.config.merge(&overlay);
        self.runtime.overlay_source = Some(source);
        Ok(())
    }

    fn user_gui_properties(&mut self) -> Result<(), BootstrapError> {
        let runtime = &mut self.runtime;
        let database = runtime
            .database
            .as_deref()
            .ok_or(BootstrapError::MissingPrerequisite {
                step: Step::UserGuiProperties,
                requires: "a database connection",
            })?;
        let session = runtime
            .session
            .as_mut()
            .ok_or(BootstrapError::MissingPrerequisite {
                step: Step::UserGuiProperties,
                requires: "a session",
            })?;
        apply_user_gui_props(session, &runtime.config, database).map_err(|source| {
            BootstrapError::Database {
                step: Step::UserGuiProperties,
                source,
            }
        })?;
        Ok(())
    }

    fn localize(&mut self) {
        let runtime = &mut self.runtime;
        let session_lang = runtime
            .session
            .as_ref()
            .and_then(|session| session.text("user_def_lang"));
        let initial_lang = runtime.config.text("user_initial_lang");
        let request = LocaleRequest {
            session_lang: session_lang.as_deref(),
            initial_lang: initial_lang.as_deref(),
            accept_language: self.request.accept_language(),
        };
        let paths = &runtime.paths;
        let locale = locale::resolve(runtime.context, request, |candidate| {
            paths.catalog(candidate.as_str()).is_file()
        });
        let translator = locale::load_translator(paths, locale, runtime.config.is_debug());
        debug!(
            target: BOOTSTRAP_TARGET,
            locale = %translator.locale(),
            messages = translator.catalog().len(),
            "locale resolved"
        );
        runtime.translator = Some(translator);
    }

    fn register_layout(&mut self) {
        self.runtime.register(LAYOUT_EVENTS, &Hook::InitLayout);
        let logged = self
            .runtime
            .session
            .as_ref()
            .is_some_and(|session| session.contains("user_logged"));
        if !logged {
            self.runtime
                .register(&[Event::AfterSetIdentity], &Hook::ResetThemeColor);
        }
    }

    fn install_output_filter(&mut self) {
        let config = &self.runtime.config;
        if config.flag("compress_output") {
            let filter =
                GzipFilter::new(DEFAULT_LEVEL).with_statistics(config.flag("show_compression_size"));
            self.runtime.output = Some(filter);
        }
    }

    fn load_plugins(&mut self) -> Result<(), BootstrapError> {
        let mut registry = PluginRegistry::discover(self.runtime.paths.plugins_dir().as_std_path())?;
        let errors = database(&self.runtime, Step::Plugins)?
            .plugin_errors()
            .map_err(|source| BootstrapError::Database {
                step: Step::Plugins,
                source,
            })?;
        registry.apply_errors(errors);
        let plugins = PluginManager::new(registry, self.plugin_loader.clone()).load_all()?;
        self.runtime.plugins = plugins;
        Ok(())
    }
}

fn database(runtime: &PanelRuntime, step: Step) -> Result<&dyn Database, BootstrapError> {
    runtime
        .database
        .as_deref()
        .ok_or(BootstrapError::MissingPrerequisite {
            step,
            requires: "a database connection",
        })
}

