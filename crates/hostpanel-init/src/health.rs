//! Structured reporting of bootstrap progress.

use std::sync::Arc;

use crate::context::{Context, Step};
use crate::errors::BootstrapError;
use crate::runtime::PanelRuntime;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface bootstrap events to telemetry sinks.
pub trait BootstrapReporter: Send + Sync {
    /// Invoked once the guard admitted the bootstrap.
    fn bootstrap_starting(&self, context: Context);

    /// Invoked after each step.
    fn step_completed(&self, context: Context, step: Step);

    /// Invoked after the runtime is ready.
    fn bootstrap_succeeded(&self, runtime: &PanelRuntime);

    /// Invoked when the bootstrap fails.
    fn bootstrap_failed(&self, context: Context, error: &BootstrapError);
}

impl<T> BootstrapReporter for Arc<T>
where
    T: BootstrapReporter + ?Sized,
{
    fn bootstrap_starting(&self, context: Context) {
        (**self).bootstrap_starting(context);
    }

    fn step_completed(&self, context: Context, step: Step) {
        (**self).step_completed(context, step);
    }

    fn bootstrap_succeeded(&self, runtime: &PanelRuntime) {
        (**self).bootstrap_succeeded(runtime);
    }

    fn bootstrap_failed(&self, context: Context, error: &BootstrapError) {
        (**self).bootstrap_failed(context, error);
    }
}

/// Default reporter that records bootstrap events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredBootstrapReporter;

impl StructuredBootstrapReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl BootstrapReporter for StructuredBootstrapReporter {
    fn bootstrap_starting(&self, context: Context) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            context = %context,
            "starting panel bootstrap"
        );
    }

    fn step_completed(&self, context: Context, step: Step) {
        tracing::debug!(
            target: HEALTH_TARGET,
            event = "step_completed",
            context = %context,
            step = %step,
            "bootstrap step completed"
        );
    }

    fn bootstrap_succeeded(&self, runtime: &PanelRuntime) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            context = %runtime.context(),
            locale = runtime.locale().map(|locale| locale.as_str()),
            timezone = %runtime.response().timezone(),
            plugins = runtime.plugins().len(),
            "panel bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, context: Context, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            context = %context,
            error = %error,
            "panel bootstrap failed"
        );
    }
}
