//! Test double for [`BootstrapReporter`] that records lifecycle events.

use std::sync::Mutex;

use crate::context::{Context, Step};
use crate::errors::BootstrapError;
use crate::health::BootstrapReporter;
use crate::runtime::PanelRuntime;

/// Bootstrap events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    /// Bootstrap admitted by the guard.
    Starting(Context),
    /// A step completed.
    StepCompleted(Step),
    /// Bootstrap completed.
    Succeeded,
    /// Bootstrap failed with an error description.
    Failed(String),
}

/// Records bootstrap events for assertions.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<ReportEvent> {
        self.events.lock().expect("reporter mutex poisoned").clone()
    }

    /// Steps reported as completed, in order.
    #[must_use]
    pub fn completed_steps(&self) -> Vec<Step> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ReportEvent::StepCompleted(step) => Some(step),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: ReportEvent) {
        self.events
            .lock()
            .expect("reporter mutex poisoned")
            .push(event);
    }
}

impl BootstrapReporter for RecordingReporter {
    fn bootstrap_starting(&self, context: Context) {
        self.record(ReportEvent::Starting(context));
    }

    fn step_completed(&self, _context: Context, step: Step) {
        self.record(ReportEvent::StepCompleted(step));
    }

    fn bootstrap_succeeded(&self, _runtime: &PanelRuntime) {
        self.record(ReportEvent::Succeeded);
    }

    fn bootstrap_failed(&self, _context: Context, error: &BootstrapError) {
        self.record(ReportEvent::Failed(error.to_string()));
    }
}
