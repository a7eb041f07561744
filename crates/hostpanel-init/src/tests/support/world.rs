//! BDD test world: a sandboxed panel, its collaborators and the bootstrap result.
//!
use std::cell::RefCell;
use std::sync::Arc;

use hostpanel_config::ConfigOverlay;

use crate::bootstrap::Sequencer;
use crate::context::{Context, RequestEnvironment};
use crate::errors::BootstrapError;
use crate::events::{Event, HookOutcome};
use crate::identity::Identity;
use crate::runtime::PanelRuntime;
use crate::state::InitState;

use super::database::{FakeConnector, FakeDatabase};
use super::plugins::ScriptedPluginLoader;
use super::reporter::RecordingReporter;
use super::sandbox::PanelSandbox;

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    pub sandbox: PanelSandbox,
    pub database: FakeDatabase,
    pub loader: ScriptedPluginLoader,
    pub reporter: Arc<RecordingReporter>,
    pub request: RequestEnvironment,
    connector: Option<FakeConnector>,
    state: InitState,
    runtime: Option<PanelRuntime>,
    error: Option<BootstrapError>,
    outcomes: Vec<HookOutcome>,
}

impl TestWorld {
    /// Builds a world around a provisioned panel.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sandbox: PanelSandbox::provisioned(),
            database: FakeDatabase::default(),
            loader: ScriptedPluginLoader::default(),
            reporter: Arc::new(RecordingReporter::default()),
            request: RequestEnvironment::http(),
            connector: None,
            state: InitState::new(),
            runtime: None,
            error: None,
            outcomes: Vec::new(),
        }
    }

    /// Replaces the panel with one lacking key material.
    pub fn remove_key_material(&mut self) {
        let sandbox = PanelSandbox::new();
        sandbox.create_database();
        self.sandbox = sandbox;
    }

    /// Stores `overlay` in the database `config` table.
    pub fn use_overlay(&mut self, overlay: ConfigOverlay) {
        self.database = FakeDatabase::with_overlay(overlay);
    }

    /// Runs the bootstrap for `context` against the world's guard.
    pub fn bootstrap(&mut self, context: Context) {
        if context == Context::Cli {
            self.request = RequestEnvironment::cli();
        }
        let connector = FakeConnector::new(self.database.clone());
        self.connector = Some(connector.clone());
        let sequencer = Sequencer::new(connector)
            .with_reporter(self.reporter.clone())
            .with_plugin_loader(self.loader.clone());
        match sequencer.run(&self.state, context, &self.request, Some(self.sandbox.config())) {
            Ok(runtime) => self.runtime = Some(runtime),
            Err(error) => self.error = Some(error),
        }
    }

    /// Dispatches `event` on the bootstrapped runtime as `identity`.
    pub fn dispatch(&mut self, event: Event, identity: &Identity) {
        if let Some(runtime) = self.runtime.as_mut() {
            self.outcomes = runtime.dispatch(event, Some(identity));
        }
    }

    /// Runtime produced by the first successful bootstrap.
    #[must_use]
    pub const fn runtime(&self) -> Option<&PanelRuntime> {
        self.runtime.as_ref()
    }

    /// Mutable access to the runtime.
    pub const fn runtime_mut(&mut self) -> Option<&mut PanelRuntime> {
        self.runtime.as_mut()
    }

    /// Error of the last failed bootstrap.
    #[must_use]
    pub const fn error(&self) -> Option<&BootstrapError> {
        self.error.as_ref()
    }

    /// Outcomes of the last dispatch.
    #[must_use]
    pub fn outcomes(&self) -> &[HookOutcome] {
        &self.outcomes
    }

    /// Decrypted passwords handed to the connector.
    #[must_use]
    pub fn connection_attempts(&self) -> Vec<String> {
        self.connector
            .as_ref()
            .map(FakeConnector::passwords)
            .unwrap_or_default()
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Default test world fixture.
#[must_use]
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
