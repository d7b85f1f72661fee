use super::solver::solve;
use super::{DetectError, DetectResult, GroupFailure, RunCache};
use crate::api::{ApiSet, DeprecationMode};
use crate::order::Reference;
use crate::probe::{DetectionOutcome, ProbeError, ProbeInputs, ProbeRunner, ProbeStatus, CODE_NO_STATUS};
use crate::progress::{NoOpHandler, ProgressEvent, ProgressHandler};
use crate::store::{Descriptor, DescriptorStore};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of evaluating one concrete candidate group.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupVerdict {
    Detected(DetectResult),
    Failed(GroupFailure),
}

pub fn default_max_concurrent_probes() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Runs the probes of a group concurrently and solves the result.
pub struct GroupEvaluator {
    store: Arc<dyn DescriptorStore>,
    runner: Arc<dyn ProbeRunner>,
    apis: ApiSet,
    deprecation_mode: DeprecationMode,
    inputs: Arc<ProbeInputs>,
    max_concurrent: usize,
    progress: Arc<dyn ProgressHandler>,
}

impl GroupEvaluator {
    pub fn new(store: Arc<dyn DescriptorStore>, runner: Arc<dyn ProbeRunner>, inputs: ProbeInputs) -> Self {
        Self {
            store,
            runner,
            apis: ApiSet::default(),
            deprecation_mode: DeprecationMode::default(),
            inputs: Arc::new(inputs),
            max_concurrent: default_max_concurrent_probes(),
            progress: Arc::new(NoOpHandler),
        }
    }

    pub fn with_apis(mut self, apis: ApiSet) -> Self {
        self.apis = apis;
        self
    }

    pub fn with_deprecation_mode(mut self, mode: DeprecationMode) -> Self {
        self.deprecation_mode = mode;
        self
    }

    /// Upper bound on probes running at once. Zero is treated as one.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.progress = progress;
        self
    }

    pub fn store(&self) -> &Arc<dyn DescriptorStore> {
        &self.store
    }

    pub fn progress(&self) -> &Arc<dyn ProgressHandler> {
        &self.progress
    }

    pub async fn evaluate(
        &self,
        cancel: &CancellationToken,
        group: &[Reference],
    ) -> Result<GroupVerdict, DetectError> {
        self.evaluate_cached(cancel, group, &RunCache::new()).await
    }

    /// Like [`evaluate`](Self::evaluate), reusing and filling `cache`.
    pub async fn evaluate_cached(
        &self,
        cancel: &CancellationToken,
        group: &[Reference],
        cache: &RunCache,
    ) -> Result<GroupVerdict, DetectError> {
        if group.is_empty() {
            return Ok(GroupVerdict::Failed(GroupFailure::Empty));
        }

        let mut elements = Vec::with_capacity(group.len());
        let mut descriptors = Vec::with_capacity(group.len());
        for reference in group {
            let descriptor = self
                .store
                .lookup(&reference.id, &reference.version, reference.kind)?;
            self.apis.verify(
                reference.kind,
                &reference.id,
                &descriptor.api,
                self.deprecation_mode,
            )?;
            elements.push(Reference {
                optional: reference.optional,
                ..descriptor.reference()
            });
            descriptors.push(descriptor);
        }

        if cancel.is_cancelled() {
            return Err(DetectError::Cancelled);
        }

        let outcomes = self.run_probes(cancel, &elements, descriptors, cache).await;

        if cancel.is_cancelled() {
            return Err(DetectError::Cancelled);
        }

        log_results(&elements, &outcomes);

        Ok(match solve(&elements, &outcomes, self.progress.as_ref()) {
            Ok(result) => GroupVerdict::Detected(result),
            Err(failure) => {
                debug!("fail: {}", failure);
                GroupVerdict::Failed(failure)
            }
        })
    }

    /// Probes every element, reusing cached outcomes. The returned outcomes
    /// are indexed like `elements`, whatever order the probes finish in.
    async fn run_probes(
        &self,
        cancel: &CancellationToken,
        elements: &[Reference],
        descriptors: Vec<Descriptor>,
        cache: &RunCache,
    ) -> Vec<DetectionOutcome> {
        let mut outcomes: Vec<Option<DetectionOutcome>> = elements
            .iter()
            .map(|reference| cache.get(&reference.key()))
            .collect();

        for (reference, outcome) in elements.iter().zip(&outcomes) {
            if let Some(outcome) = outcome {
                self.report_probe(reference, outcome, Duration::ZERO, true);
            }
        }

        // A cached fatal outcome already decides the group.
        if outcomes.iter().flatten().any(DetectionOutcome::is_fatal) {
            return outcomes
                .into_iter()
                .map(|o| o.unwrap_or_else(DetectionOutcome::cancelled))
                .collect();
        }

        let group_token = cancel.child_token();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = JoinSet::new();

        for (index, descriptor) in descriptors.into_iter().enumerate() {
            if outcomes[index].is_some() {
                continue;
            }

            let runner = Arc::clone(&self.runner);
            let inputs = Arc::clone(&self.inputs);
            let semaphore = Arc::clone(&semaphore);
            let token = group_token.clone();

            tasks.spawn(async move {
                let _permit = tokio::select! {
                    permit = semaphore.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return (index, DetectionOutcome::cancelled(), Duration::ZERO),
                    },
                    _ = token.cancelled() => return (index, DetectionOutcome::cancelled(), Duration::ZERO),
                };
                let started = Instant::now();
                let outcome = runner.run(&token, &descriptor, &inputs).await;
                (index, outcome, started.elapsed())
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (index, outcome, duration) = match joined {
                Ok(finished) => finished,
                Err(e) => {
                    warn!(error = %e, "Probe task did not complete");
                    continue;
                }
            };

            let reference = &elements[index];
            self.report_probe(reference, &outcome, duration, false);

            if outcome.is_fatal() && !outcome.is_cancelled() {
                debug!(element = %reference, "Fatal probe outcome, cancelling the rest of the group");
                group_token.cancel();
            }
            cache.insert(reference.key(), outcome.clone());
            outcomes[index] = Some(outcome);
        }

        outcomes
            .into_iter()
            .map(|o| {
                o.unwrap_or_else(|| {
                    DetectionOutcome::fatal(
                        CODE_NO_STATUS,
                        ProbeError::Io("probe task did not complete".to_string()),
                    )
                })
            })
            .collect()
    }

    fn report_probe(&self, reference: &Reference, outcome: &DetectionOutcome, duration: Duration, cached: bool) {
        self.progress.on_progress(&ProgressEvent::ProbeFinished {
            module: reference.to_string(),
            status: outcome.status(),
            optional: reference.optional,
            duration,
            cached,
        });
    }
}

/// Logs the per-element summary, with the captured output of the probes
/// that made the group fail.
fn log_results(elements: &[Reference], outcomes: &[DetectionOutcome]) {
    for (reference, outcome) in elements.iter().zip(outcomes) {
        let failed = match outcome.status() {
            ProbeStatus::Pass => false,
            ProbeStatus::Fail => !reference.optional,
            ProbeStatus::Fatal => !outcome.is_cancelled(),
        };
        if failed && !outcome.output.is_empty() {
            info!(
                element = %reference,
                "======== Output: {} ========\n{}",
                reference,
                outcome.output_lossy().trim_end()
            );
        } else if !outcome.output.is_empty() {
            debug!(element = %reference, output = %outcome.output_lossy().trim_end(), "Probe output");
        }
    }

    for (reference, outcome) in elements.iter().zip(outcomes) {
        match outcome.status() {
            ProbeStatus::Pass => debug!("pass: {}", reference),
            ProbeStatus::Fail if reference.optional => debug!("skip: {}", reference),
            ProbeStatus::Fail => debug!("fail: {}", reference),
            ProbeStatus::Fatal if outcome.is_cancelled() => debug!("cancelled: {}", reference),
            ProbeStatus::Fatal => info!("err:  {} ({}): {}", reference, outcome.code, outcome.reason()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::BuildEnv;
    use crate::order::Kind;
    use crate::plan::{DetectPlan, PlanSections};
    use crate::probe::StaticProbeRunner;
    use crate::store::MemoryStore;

    fn inputs() -> ProbeInputs {
        ProbeInputs::new("/workspace", "/platform", BuildEnv::default())
    }

    fn provides(names: &[&str]) -> DetectionOutcome {
        DetectionOutcome::pass(DetectPlan::new(
            PlanSections::default().provides(names.iter().copied()),
        ))
    }

    fn requires(names: &[&str]) -> DetectionOutcome {
        DetectionOutcome::pass(DetectPlan::new(
            PlanSections::default().requires(names.iter().copied()),
        ))
    }

    fn store() -> Arc<MemoryStore> {
        Arc::new(
            MemoryStore::new()
                .with_buildpack("A", "v1", "0.9")
                .with_buildpack("B", "v1", "0.10")
                .with_buildpack("C", "v1", "0.9")
                .with_buildpack("old", "v1", "0.2")
                .with_extension("E", "v1", "0.10"),
        )
    }

    fn evaluator(runner: Arc<StaticProbeRunner>) -> GroupEvaluator {
        GroupEvaluator::new(store(), runner, inputs())
    }

    #[tokio::test]
    async fn test_detected_group_carries_descriptor_api() {
        let runner = Arc::new(
            StaticProbeRunner::new()
                .with_outcome("A@v1", provides(&["X"]))
                .with_outcome("B@v1", requires(&["X"])),
        );
        let verdict = evaluator(runner)
            .evaluate(
                &CancellationToken::new(),
                &[Reference::new("A", "v1"), Reference::new("B", "v1")],
            )
            .await
            .unwrap();

        let result = match verdict {
            GroupVerdict::Detected(result) => result,
            other => panic!("Expected detected group, got {other:?}"),
        };
        assert_eq!(result.group.group[0].api.as_deref(), Some("0.9"));
        assert_eq!(result.group.group[1].api.as_deref(), Some("0.10"));
        assert_eq!(result.plan.entries[0].name, "X");
    }

    #[tokio::test]
    async fn test_unsupported_api_is_an_error() {
        let runner = Arc::new(StaticProbeRunner::new());
        let err = evaluator(runner.clone())
            .evaluate(&CancellationToken::new(), &[Reference::new("old", "v1")])
            .await
            .unwrap_err();
        assert!(err.is_incompatible_api());
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_descriptor_is_an_error() {
        let runner = Arc::new(StaticProbeRunner::new());
        let err = evaluator(runner)
            .evaluate(&CancellationToken::new(), &[Reference::new("nope", "v1")])
            .await
            .unwrap_err();
        assert!(matches!(err, DetectError::Store(_)));
    }

    #[tokio::test]
    async fn test_fatal_probe_cancels_siblings() {
        let runner = Arc::new(
            StaticProbeRunner::new()
                .with_delayed_outcome("A@v1", provides(&[]), Duration::from_secs(30))
                .with_outcome(
                    "B@v1",
                    DetectionOutcome {
                        code: 17,
                        ..DetectionOutcome::fail()
                    },
                ),
        );

        let started = Instant::now();
        let verdict = evaluator(runner)
            .with_max_concurrent(4)
            .evaluate(
                &CancellationToken::new(),
                &[Reference::new("A", "v1"), Reference::new("B", "v1")],
            )
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(10));
        match verdict {
            GroupVerdict::Failed(GroupFailure::Fatal { element, code, .. }) => {
                assert_eq!(element, "B@v1");
                assert_eq!(code, 17);
            }
            other => panic!("Expected fatal failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cache_reuses_outcomes() {
        let runner = Arc::new(StaticProbeRunner::new().with_outcome("A@v1", provides(&[])));
        let evaluator = evaluator(runner.clone());
        let cache = RunCache::new();
        let token = CancellationToken::new();

        let first = evaluator
            .evaluate_cached(&token, &[Reference::new("A", "v1"), Reference::new("B", "v1")], &cache)
            .await
            .unwrap();
        assert!(matches!(first, GroupVerdict::Failed(GroupFailure::Detection { .. })));

        let second = evaluator
            .evaluate_cached(&token, &[Reference::new("A", "v1")], &cache)
            .await
            .unwrap();
        assert!(matches!(second, GroupVerdict::Detected(_)));
        assert_eq!(runner.call_count("A@v1"), 1);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_cancellation_returns_cancelled() {
        let runner = Arc::new(StaticProbeRunner::new().with_delayed_outcome(
            "A@v1",
            provides(&[]),
            Duration::from_secs(30),
        ));
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let err = evaluator(runner)
            .evaluate(&token, &[Reference::new("A", "v1")])
            .await
            .unwrap_err();
        assert!(matches!(err, DetectError::Cancelled));
    }

    #[tokio::test]
    async fn test_concurrency_bound_of_one_still_completes() {
        let runner = Arc::new(
            StaticProbeRunner::new()
                .with_delayed_outcome("A@v1", provides(&["X"]), Duration::from_millis(10))
                .with_delayed_outcome("C@v1", requires(&["X"]), Duration::from_millis(10)),
        );
        let verdict = evaluator(runner)
            .with_max_concurrent(0)
            .evaluate(
                &CancellationToken::new(),
                &[Reference::new("A", "v1"), Reference::new("C", "v1")],
            )
            .await
            .unwrap();
        assert!(matches!(verdict, GroupVerdict::Detected(_)));
    }

    #[tokio::test]
    async fn test_extension_only_group_is_not_viable() {
        let runner = Arc::new(StaticProbeRunner::new().with_outcome("E@v1", provides(&[])));
        let verdict = evaluator(runner)
            .evaluate(
                &CancellationToken::new(),
                &[Reference {
                    kind: Kind::Extension,
                    ..Reference::new("E", "v1").optional()
                }],
            )
            .await
            .unwrap();
        assert_eq!(verdict, GroupVerdict::Failed(GroupFailure::NoViableBuildpacks));
    }
}
