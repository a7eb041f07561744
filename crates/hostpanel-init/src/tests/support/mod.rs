//! Test harness utilities for the initializer unit and behavioural suites.

mod database;
mod plugins;
mod reporter;
mod sandbox;
mod template;
mod world;

pub use database::{FakeConnector, FakeDatabase};
pub use plugins::ScriptedPluginLoader;
pub use reporter::{RecordingReporter, ReportEvent};
pub use sandbox::{DATABASE_PASSWORD, PanelSandbox, SCHEMA};
pub use template::RecordingTemplate;
pub use world::{TestWorld, world};
