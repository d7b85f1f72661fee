use crate::plan::DetectPlan;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const CODE_DETECT_PASS: i32 = 0;
pub const CODE_DETECT_FAIL: i32 = 100;

/// Code recorded when the probe never produced an exit status of its own.
pub const CODE_NO_STATUS: i32 = -1;

/// Why a probe run was fatal. Payloads are plain strings so outcomes can be
/// cloned out of the run cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("failed to launch {path}: {message}")]
    Launch { path: PathBuf, message: String },

    #[error("detect exited with code {0}")]
    ExitCode(i32),

    #[error("detect was terminated by a signal")]
    Signal,

    #[error("detect timed out after {0:?}")]
    Timeout(Duration),

    #[error("detect was cancelled")]
    Cancelled,

    #[error("failed to decode plan {path}: {message}")]
    PlanDecode { path: PathBuf, message: String },

    #[error("{0}")]
    InvalidPlan(String),

    #[error("failed to prepare environment: {0}")]
    Environment(String),

    #[error("failed to prepare plan directory: {0}")]
    Io(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    Pass,
    Fail,
    Fatal,
}

/// Everything observed from one probe run.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionOutcome {
    pub code: i32,
    pub plan: DetectPlan,
    /// Combined stdout and stderr, kept for diagnostics.
    pub output: Vec<u8>,
    pub error: Option<ProbeError>,
}

impl DetectionOutcome {
    pub fn pass(plan: DetectPlan) -> Self {
        Self {
            code: CODE_DETECT_PASS,
            plan,
            output: Vec::new(),
            error: None,
        }
    }

    pub fn fail() -> Self {
        Self {
            code: CODE_DETECT_FAIL,
            plan: DetectPlan::default(),
            output: Vec::new(),
            error: None,
        }
    }

    pub fn fatal(code: i32, error: ProbeError) -> Self {
        Self {
            code,
            plan: DetectPlan::default(),
            output: Vec::new(),
            error: Some(error),
        }
    }

    pub fn cancelled() -> Self {
        Self::fatal(CODE_NO_STATUS, ProbeError::Cancelled)
    }

    pub fn with_output(mut self, output: Vec<u8>) -> Self {
        self.output = output;
        self
    }

    pub fn status(&self) -> ProbeStatus {
        match (self.code, &self.error) {
            (_, Some(_)) => ProbeStatus::Fatal,
            (CODE_DETECT_PASS, None) => ProbeStatus::Pass,
            (CODE_DETECT_FAIL, None) => ProbeStatus::Fail,
            _ => ProbeStatus::Fatal,
        }
    }

    pub fn is_pass(&self) -> bool {
        self.status() == ProbeStatus::Pass
    }

    pub fn is_fatal(&self) -> bool {
        self.status() == ProbeStatus::Fatal
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.error, Some(ProbeError::Cancelled))
    }

    /// Human readable reason for a fatal outcome.
    pub fn reason(&self) -> String {
        match &self.error {
            Some(e) => e.to_string(),
            None => ProbeError::ExitCode(self.code).to_string(),
        }
    }

    pub fn output_lossy(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(DetectionOutcome::pass(DetectPlan::default()).status(), ProbeStatus::Pass);
        assert_eq!(DetectionOutcome::fail().status(), ProbeStatus::Fail);

        let odd_code = DetectionOutcome {
            code: 17,
            ..DetectionOutcome::fail()
        };
        assert!(odd_code.is_fatal());
        assert_eq!(odd_code.reason(), "detect exited with code 17");

        let errored = DetectionOutcome {
            error: Some(ProbeError::InvalidPlan("bad".to_string())),
            ..DetectionOutcome::pass(DetectPlan::default())
        };
        assert!(errored.is_fatal());
        assert!(!errored.is_pass());
    }

    #[test]
    fn test_cancelled() {
        let outcome = DetectionOutcome::cancelled();
        assert!(outcome.is_cancelled());
        assert!(outcome.is_fatal());
    }
}
