//! Command-line entry point: bootstraps the panel for a maintenance job.

use std::io::{self, Write};
use std::process::ExitCode;

use hostpanel_config::PanelConfig;
use hostpanel_init::database::SqliteConnector;
use hostpanel_init::{
    ConfigLoader, Context, InitState, RequestEnvironment, Sequencer, SystemConfigLoader, telemetry,
};
use tracing::{error, info};

const MAIN_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::main");

fn main() -> ExitCode {
    let config = match SystemConfigLoader.load() {
        Ok(config) => config,
        Err(error) => {
            let _ = writeln!(io::stderr(), "hostpanel-init: {error}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(error) = telemetry::initialise(&config) {
        let _ = writeln!(io::stderr(), "hostpanel-init: {error}");
        return ExitCode::FAILURE;
    }
    run(config)
}

fn run(config: PanelConfig) -> ExitCode {
    let sequencer = Sequencer::new(SqliteConnector);
    let request_state = InitState::new();
    match sequencer.run(
        &request_state,
        Context::Cli,
        &RequestEnvironment::cli(),
        Some(config),
    ) {
        Ok(runtime) => {
            info!(
                target: MAIN_TARGET,
                locale = ?runtime.locale().map(ToString::to_string),
                timezone = %runtime.response().timezone(),
                "panel initialized"
            );
            ExitCode::SUCCESS
        }
        Err(error) => {
            error!(target: MAIN_TARGET, %error, "panel initialization failed");
            ExitCode::FAILURE
        }
    }
}
