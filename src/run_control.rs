//! Run lifecycle shared by the batch pipeline and the interactive classifier.
//!
//! Each driver owns a busy flag and a [`PipelineState`]. A [`RunGuard`] holds the
//! flag for the duration of one run, so a second start is rejected synchronously with
//! [`PhotClassError::RunInProgress`]. Workers are stopped cooperatively through a
//! [`CancelToken`].
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use crate::photclass_errors::PhotClassError;

/// Lifecycle of a pipeline or classifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PipelineState {
    #[default]
    Idle,
    Running,
    Completed,
    Cancelled,
    Errored,
}

/// Cooperative cancellation flag shared with a worker.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Busy flag and state of one driver.
#[derive(Debug, Clone, Default)]
pub(crate) struct RunSlot {
    running: Arc<AtomicBool>,
    state: Arc<Mutex<PipelineState>>,
}

impl RunSlot {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn state(&self) -> PipelineState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Mark the driver busy, or fail if a run is already active.
    ///
    /// The state switches to `Running` immediately. Until [`RunGuard::started`] is
    /// called, dropping the guard restores the previous state: the run never began.
    pub(crate) fn acquire(&self) -> Result<RunGuard, PhotClassError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(PhotClassError::RunInProgress);
        }
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let previous = std::mem::replace(&mut *state, PipelineState::Running);
        drop(state);

        Ok(RunGuard {
            slot: self.clone(),
            previous,
            started: false,
        })
    }
}

/// Holds the busy flag of a [`RunSlot`] for the lifetime of one run.
pub(crate) struct RunGuard {
    slot: RunSlot,
    previous: PipelineState,
    started: bool,
}

impl RunGuard {
    /// The run has begun executing; from now on an unreported end counts as `Errored`.
    pub(crate) fn started(mut self) -> Self {
        self.started = true;
        self
    }

    pub(crate) fn finish(self, end: PipelineState) {
        *self.slot.state.lock().unwrap_or_else(|e| e.into_inner()) = end;
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut state = self.slot.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state == PipelineState::Running {
            *state = if self.started {
                // the run unwound before reporting how it ended
                PipelineState::Errored
            } else {
                self.previous
            };
        }
        drop(state);
        self.slot.running.store(false, Ordering::Release);
    }
}
