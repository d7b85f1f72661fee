use super::{DetectError, DetectResult, FailureReport, GroupEvaluator, GroupVerdict, RunCache};
use crate::order::{flatten, Kind, Order, OrderDocument, Reference};
use crate::progress::ProgressEvent;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// What a fatal probe failure means for the rest of the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FatalPolicy {
    /// Record the failure and move on to the next candidate.
    #[default]
    TryNextGroup,
    /// Stop and return the failure.
    Abort,
}

impl FromStr for FatalPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "next" | "try-next-group" => Ok(Self::TryNextGroup),
            "abort" => Ok(Self::Abort),
            other => Err(format!(
                "Invalid fatal policy '{}'. Valid options: next, abort",
                other
            )),
        }
    }
}

impl fmt::Display for FatalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TryNextGroup => f.write_str("next"),
            Self::Abort => f.write_str("abort"),
        }
    }
}

/// Finds the first candidate group of an order that detects.
pub struct OrderResolver {
    evaluator: GroupEvaluator,
    policy: FatalPolicy,
}

impl OrderResolver {
    pub fn new(evaluator: GroupEvaluator) -> Self {
        Self {
            evaluator,
            policy: FatalPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FatalPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn evaluator(&self) -> &GroupEvaluator {
        &self.evaluator
    }

    /// Concrete candidate groups in priority order. Composite buildpacks are
    /// expanded through the descriptor store.
    pub fn flatten(&self, order: &Order) -> Result<Vec<Vec<Reference>>, DetectError> {
        let store = self.evaluator.store();
        flatten(order, |reference: &Reference| -> Result<Option<Order>, DetectError> {
            if reference.kind != Kind::Buildpack {
                return Ok(None);
            }
            let descriptor = store.lookup(&reference.id, &reference.version, reference.kind)?;
            Ok(descriptor.is_composite().then_some(descriptor.order))
        })
    }

    /// Resolves the buildpack order of an `order.toml`, with its extensions prepended.
    pub async fn resolve_document(
        &self,
        cancel: &CancellationToken,
        document: &OrderDocument,
    ) -> Result<DetectResult, DetectError> {
        self.resolve(cancel, &document.detect_order()).await
    }

    pub async fn resolve(&self, cancel: &CancellationToken, order: &Order) -> Result<DetectResult, DetectError> {
        let started = Instant::now();
        let candidates = self.flatten(order)?;
        let progress = self.evaluator.progress();
        progress.on_progress(&ProgressEvent::Started {
            candidates: candidates.len(),
        });
        debug!(candidates = candidates.len(), policy = %self.policy, "Resolving order");

        // Attempt-scoped: dropped when this call returns.
        let cache = RunCache::new();
        let mut report = FailureReport::default();

        for (index, group) in candidates.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(DetectError::Cancelled);
            }

            let names: Vec<String> = group.iter().map(|r| r.to_string()).collect();
            progress.on_progress(&ProgressEvent::GroupStarted {
                index,
                total: candidates.len(),
                group: names.clone(),
            });

            match self.evaluator.evaluate_cached(cancel, group, &cache).await? {
                GroupVerdict::Detected(result) => {
                    progress.on_progress(&ProgressEvent::GroupDetected {
                        index,
                        group: result.group.ids(),
                    });
                    progress.on_progress(&ProgressEvent::Completed {
                        detected: true,
                        attempts: index + 1,
                        total_time: started.elapsed(),
                    });
                    return Ok(result);
                }
                GroupVerdict::Failed(failure) => {
                    progress.on_progress(&ProgressEvent::GroupFailed {
                        index,
                        reason: failure.to_string(),
                    });
                    if failure.is_fatal() && self.policy == FatalPolicy::Abort {
                        return Err(DetectError::Fatal {
                            group: names.join(", "),
                            failure,
                        });
                    }
                    report.push(index, group, failure);
                }
            }
        }

        progress.on_progress(&ProgressEvent::Completed {
            detected: false,
            attempts: report.attempts.len(),
            total_time: started.elapsed(),
        });
        info!(attempts = report.attempts.len(), "No buildpack group passed detection");
        Err(DetectError::NoGroupDetected(report))
    }
}
