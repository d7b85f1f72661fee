//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use crate::probe::ProbeStatus;
use tracing::{debug, info};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started { candidates } => {
                info!(candidates, "Starting detection");
            }
            ProgressEvent::GroupStarted {
                index,
                total,
                group,
            } => {
                debug!(
                    progress = format!("{}/{}", index + 1, total),
                    group = %group.join(", "),
                    "Evaluating group"
                );
            }
            ProgressEvent::ProbeFinished {
                module,
                status,
                optional,
                duration,
                cached,
            } => {
                let label = match (status, optional) {
                    (ProbeStatus::Pass, _) => "pass",
                    (ProbeStatus::Fail, true) => "skip",
                    (ProbeStatus::Fail, false) => "fail",
                    (ProbeStatus::Fatal, _) => "err",
                };
                debug!(
                    module = %module,
                    cached,
                    duration_ms = duration.as_millis(),
                    "{}",
                    label
                );
            }
            ProgressEvent::TrialStarted { trial, total } => {
                debug!(trial, total, "Resolving plan");
            }
            ProgressEvent::GroupDetected { index, group } => {
                info!(index, group = %group.join(", "), "Group detected");
            }
            ProgressEvent::GroupFailed { index, reason } => {
                debug!(index, reason = %reason, "Group failed");
            }
            ProgressEvent::Completed {
                detected,
                attempts,
                total_time,
            } => {
                info!(
                    detected,
                    attempts,
                    total_time_ms = total_time.as_millis(),
                    "Detection complete"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_logging_all_events() {
        let handler = LoggingHandler;

        let events = vec![
            ProgressEvent::Started { candidates: 3 },
            ProgressEvent::GroupStarted {
                index: 0,
                total: 3,
                group: vec!["A@v1".to_string()],
            },
            ProgressEvent::ProbeFinished {
                module: "A@v1".to_string(),
                status: ProbeStatus::Pass,
                optional: false,
                duration: Duration::from_millis(5),
                cached: false,
            },
            ProgressEvent::ProbeFinished {
                module: "B@v1".to_string(),
                status: ProbeStatus::Fail,
                optional: true,
                duration: Duration::from_millis(5),
                cached: true,
            },
            ProgressEvent::TrialStarted { trial: 1, total: 1 },
            ProgressEvent::GroupFailed {
                index: 0,
                reason: "fail".to_string(),
            },
            ProgressEvent::GroupDetected {
                index: 1,
                group: vec!["A@v1".to_string()],
            },
            ProgressEvent::Completed {
                detected: true,
                attempts: 2,
                total_time: Duration::from_secs(1),
            },
        ];

        for event in events {
            handler.on_progress(&event);
        }
    }
}
