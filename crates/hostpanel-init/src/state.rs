//! One-time initialization guard.

use std::sync::atomic::{AtomicU8, Ordering};

use hostpanel_config::InitScope;

use crate::errors::BootstrapError;

static PROCESS_STATE: InitState = InitState::new();

/// Lifecycle of a guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No bootstrap has been attempted.
    NotStarted,
    /// A bootstrap is in progress.
    Running,
    /// A bootstrap completed.
    Done,
    /// A bootstrap aborted; the guard stays closed.
    Failed,
}

impl Phase {
    const fn to_raw(self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::Running => 1,
            Self::Done => 2,
            Self::Failed => 3,
        }
    }

    const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::NotStarted,
            1 => Self::Running,
            2 => Self::Done,
            _ => Self::Failed,
        }
    }
}

/// Guard admitting at most one bootstrap.
///
/// The process-wide guard is reached through [`process_state`]; persistent
/// workers create one guard per request instead and select between the two
/// with [`InitState::for_scope`].
#[derive(Debug)]
pub struct InitState {
    phase: AtomicU8,
}

impl InitState {
    /// Creates an unused guard.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: AtomicU8::new(Phase::NotStarted.to_raw()),
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        Phase::from_raw(self.phase.load(Ordering::Acquire))
    }

    /// Returns the guard governing `scope`: the process guard, or `self`.
    #[must_use]
    pub fn for_scope(&self, scope: InitScope) -> &Self {
        match scope {
            InitScope::Process => process_state(),
            InitScope::Request => self,
        }
    }

    pub(crate) fn begin(&self) -> Result<(), BootstrapError> {
        self.phase
            .compare_exchange(
                Phase::NotStarted.to_raw(),
                Phase::Running.to_raw(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(drop)
            .map_err(|current| BootstrapError::AlreadyInitialized {
                phase: Phase::from_raw(current),
            })
    }

    pub(crate) fn finish(&self, phase: Phase) {
        self.phase.store(phase.to_raw(), Ordering::Release);
    }
}

impl Default for InitState {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard shared by every bootstrap in this process.
#[must_use]
pub fn process_state() -> &'static InitState {
    &PROCESS_STATE
}
