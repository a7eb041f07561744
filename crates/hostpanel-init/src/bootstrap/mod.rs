//! Bootstrap orchestration.
//!
//! [`Sequencer::run`] admits one bootstrap per initialization guard, then
//! runs the fixed step table of the request's [`Context`] against a fresh
//! [`PanelRuntime`]. The first failing step aborts the sequence, leaves the
//! guard in [`Phase::Failed`] and is reported before the error is returned;
//! completed steps are not rolled back.

mod steps;

use std::sync::Arc;

use hostpanel_config::PanelConfig;
use hostpanel_plugins::{EntryPointLoader, PluginLoader};
use ortho_config::{OrthoConfig as _, OrthoError};
use tracing::debug;

use crate::context::{Context, RequestEnvironment};
use crate::database::DatabaseConnector;
use crate::errors::BootstrapError;
use crate::events::{Event, EventContext, Hook, HookCallback, HookOutcome, RevisionProbe, UpdateProbe};
use crate::health::{BootstrapReporter, StructuredBootstrapReporter};
use crate::runtime::PanelRuntime;
use crate::state::{InitState, Phase};

use self::steps::StepRunner;

const BOOTSTRAP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bootstrap");

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the base configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader error when a layer is malformed.
    fn load(&self) -> Result<PanelConfig, Arc<OrthoError>>;
}

/// Loader that delegates to [`PanelConfig::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<PanelConfig, Arc<OrthoError>> {
        PanelConfig::load()
    }
}

/// Loader returning a configuration resolved earlier.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: PanelConfig,
}

impl StaticConfigLoader {
    /// Wraps an already loaded configuration.
    #[must_use]
    pub const fn new(config: PanelConfig) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<PanelConfig, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Runs the bootstrap with the supplied collaborators.
pub struct Sequencer<C, L = EntryPointLoader> {
    connector: C,
    plugin_loader: L,
    config_loader: Arc<dyn ConfigLoader>,
    reporter: Arc<dyn BootstrapReporter>,
    update_probe: Arc<dyn UpdateProbe>,
    callbacks: Vec<(Vec<Event>, HookCallback)>,
}

impl<C> Sequencer<C> {
    /// Sequencer using `connector` and the default collaborators: the system
    /// configuration loader, the structured reporter, the schema revision
    /// probe and the entry point plugin loader.
    #[must_use]
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            plugin_loader: EntryPointLoader,
            config_loader: Arc::new(SystemConfigLoader),
            reporter: Arc::new(StructuredBootstrapReporter::new()),
            update_probe: Arc::new(RevisionProbe),
            callbacks: Vec::new(),
        }
    }
}

impl<C, L> Sequencer<C, L> {
    /// Replaces the configuration loader used when `run` gets no config.
    #[must_use]
    pub fn with_config_loader(mut self, loader: impl ConfigLoader + 'static) -> Self {
        self.config_loader = Arc::new(loader);
        self
    }

    /// Replaces the bootstrap reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn BootstrapReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Replaces the probe consulted by the database update hook.
    #[must_use]
    pub fn with_update_probe(mut self, probe: Arc<dyn UpdateProbe>) -> Self {
        self.update_probe = probe;
        self
    }

    /// Replaces the plugin loader.
    #[must_use]
    pub fn with_plugin_loader<M>(self, plugin_loader: M) -> Sequencer<C, M> {
        Sequencer {
            connector: self.connector,
            plugin_loader,
            config_loader: self.config_loader,
            reporter: self.reporter,
            update_probe: self.update_probe,
            callbacks: self.callbacks,
        }
    }

    /// Registers a callback on `events` in every runtime this sequencer
    /// produces. Callbacks on [`Event::AfterInitialize`] run at the end of
    /// the bootstrap.
    #[must_use]
    pub fn on<F>(mut self, events: &[Event], callback: F) -> Self
    where
        F: Fn(&mut EventContext<'_>) -> HookOutcome + Send + Sync + 'static,
    {
        let callback: HookCallback = Arc::new(callback);
        self.callbacks.push((events.to_vec(), callback));
        self
    }
}

impl<C, L> Sequencer<C, L>
where
    C: DatabaseConnector,
    L: PluginLoader + Clone,
{
    /// Bootstraps the panel for `context`.
    ///
    /// `request_state` is used as the guard when the configuration selects
    /// request scope; process scope uses the process-wide guard instead.
    /// When `config` is `None` the base configuration comes from the
    /// sequencer's [`ConfigLoader`].
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::AlreadyInitialized`] when the guard was
    /// already used, and the error of the first failing step otherwise.
    pub fn run(
        &self,
        request_state: &InitState,
        context: Context,
        request: &RequestEnvironment,
        config: Option<PanelConfig>,
    ) -> Result<PanelRuntime, BootstrapError> {
        let config = match config {
            Some(config) => config,
            None => self.config_loader.load().map_err(|source| {
                let error = BootstrapError::Configuration { source };
                self.reporter.bootstrap_failed(context, &error);
                error
            })?,
        };

        let state = request_state.for_scope(config.init_scope());
        if let Err(error) = state.begin() {
            self.reporter.bootstrap_failed(context, &error);
            return Err(error);
        }
        self.reporter.bootstrap_starting(context);

        let mut runtime = PanelRuntime::new(context, &config);
        for (events, callback) in &self.callbacks {
            runtime.register(events, &Hook::Callback(Arc::clone(callback)));
        }

        let mut runner = StepRunner {
            connector: &self.connector,
            plugin_loader: &self.plugin_loader,
            update_probe: &self.update_probe,
            request,
            runtime,
        };
        for &step in context.steps() {
            if let Err(error) = runner.run(step) {
                state.finish(Phase::Failed);
                self.reporter.bootstrap_failed(context, &error);
                return Err(error);
            }
            self.reporter.step_completed(context, step);
        }

        let mut runtime = runner.runtime;
        let outcomes = runtime.dispatch(Event::AfterInitialize, None);
        debug!(
            target: BOOTSTRAP_TARGET,
            context = %context,
            outcomes = outcomes.len(),
            "dispatched AfterInitialize"
        );
        state.finish(Phase::Done);
        self.reporter.bootstrap_succeeded(&runtime);
        Ok(runtime)
    }
}
