//! Progress handler trait and events

use crate::probe::ProbeStatus;
use std::time::Duration;

/// Events emitted while resolving an order
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Resolution started over the flattened candidate groups
    Started { candidates: usize },

    /// A candidate group is about to be evaluated
    GroupStarted {
        index: usize,
        total: usize,
        group: Vec<String>,
    },

    /// A probe finished, or its outcome was reused from an earlier group
    ProbeFinished {
        module: String,
        status: ProbeStatus,
        optional: bool,
        duration: Duration,
        cached: bool,
    },

    /// The solver is trying one combination of plan alternatives
    TrialStarted { trial: usize, total: usize },

    /// A candidate group detected
    GroupDetected { index: usize, group: Vec<String> },

    /// A candidate group failed
    GroupFailed { index: usize, reason: String },

    /// Resolution finished
    Completed {
        detected: bool,
        attempts: usize,
        total_time: Duration,
    },
}

/// Trait for handling progress events during detection
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
