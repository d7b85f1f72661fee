//! Scripted probe runner for tests and dry runs.

use super::validate::validate_outcome;
use super::{DetectionOutcome, ProbeInputs, ProbeRunner};
use crate::store::Descriptor;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
struct Script {
    outcome: DetectionOutcome,
    delay: Option<Duration>,
}

/// Returns a fixed outcome per `id@version` without spawning anything.
///
/// Unscripted modules fail detection (exit 100). Every call is recorded so
/// tests can assert which probes ran and how often.
#[derive(Debug, Default)]
pub struct StaticProbeRunner {
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<String>>,
}

impl StaticProbeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outcome(mut self, module: &str, outcome: DetectionOutcome) -> Self {
        self.scripts.insert(
            module.to_string(),
            Script {
                outcome,
                delay: None,
            },
        );
        self
    }

    /// Like [`with_outcome`](Self::with_outcome), but the probe takes `delay`
    /// to finish. Cancellation during the delay yields a cancelled outcome.
    pub fn with_delayed_outcome(mut self, module: &str, outcome: DetectionOutcome, delay: Duration) -> Self {
        self.scripts.insert(
            module.to_string(),
            Script {
                outcome,
                delay: Some(delay),
            },
        );
        self
    }

    /// Modules probed so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn call_count(&self, module: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == module).count()
    }

    fn record(&self, module: String) {
        match self.calls.lock() {
            Ok(mut calls) => calls.push(module),
            Err(poisoned) => poisoned.into_inner().push(module),
        }
    }
}

#[async_trait]
impl ProbeRunner for StaticProbeRunner {
    async fn run(
        &self,
        cancel: &CancellationToken,
        descriptor: &Descriptor,
        _inputs: &ProbeInputs,
    ) -> DetectionOutcome {
        if cancel.is_cancelled() {
            return DetectionOutcome::cancelled();
        }

        let module = format!("{}@{}", descriptor.info.id, descriptor.info.version);
        self.record(module.clone());

        let Some(script) = self.scripts.get(&module) else {
            return DetectionOutcome::fail();
        };

        if let Some(delay) = script.delay {
            tokio::select! {
                _ = cancel.cancelled() => return DetectionOutcome::cancelled(),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        validate_outcome(descriptor, script.outcome.clone())
    }
}
