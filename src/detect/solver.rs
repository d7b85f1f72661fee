//! Turns the probe outcomes of one group into a resolved group and build plan.
//!
//! Pure: works on the completed set of outcomes, so arrival order of the
//! probes never influences the result.

use super::{DetectResult, GroupFailure, ResolvedGroup};
use crate::order::Reference;
use crate::plan::{BuildPlan, BuildPlanEntry, PlanSections};
use crate::probe::{DetectionOutcome, ProbeStatus};
use crate::progress::{ProgressEvent, ProgressHandler};
use tracing::debug;

struct Candidate<'a> {
    reference: &'a Reference,
    options: Vec<PlanSections>,
}

/// Solves a group. `outcomes[i]` belongs to `elements[i]`.
pub fn solve(
    elements: &[Reference],
    outcomes: &[DetectionOutcome],
    progress: &dyn ProgressHandler,
) -> Result<DetectResult, GroupFailure> {
    if elements.is_empty() {
        return Err(GroupFailure::Empty);
    }

    if let Some(failure) = fatal_failure(elements, outcomes) {
        return Err(failure);
    }

    let mut passing = Vec::new();
    for (reference, outcome) in elements.iter().zip(outcomes) {
        match outcome.status() {
            ProbeStatus::Pass => passing.push(Candidate {
                reference,
                options: outcome.plan.options(),
            }),
            ProbeStatus::Fail if reference.optional => {}
            _ => {
                return Err(GroupFailure::Detection {
                    element: reference.to_string(),
                })
            }
        }
    }

    if !passing.iter().any(|c| !c.reference.is_extension()) {
        return Err(GroupFailure::NoViableBuildpacks);
    }

    let total = trial_count(&passing);
    let mut first_failure = None;

    for (trial, choice) in combinations(&passing).enumerate() {
        progress.on_progress(&ProgressEvent::TrialStarted {
            trial: trial + 1,
            total,
        });
        debug!("Resolving plan... (try #{})", trial + 1);

        let sections: Vec<&PlanSections> = passing
            .iter()
            .zip(&choice)
            .map(|(c, &option)| &c.options[option])
            .collect();

        match run_trial(&passing, &sections) {
            Ok(result) => return Ok(result),
            Err(failure) => {
                debug!(reason = %failure, "Trial failed");
                first_failure.get_or_insert(failure);
            }
        }
    }

    Err(first_failure.unwrap_or(GroupFailure::NoViableBuildpacks))
}

/// The first real fatal outcome in input order. Outcomes cancelled because a
/// sibling failed only count when nothing else explains the failure.
fn fatal_failure(elements: &[Reference], outcomes: &[DetectionOutcome]) -> Option<GroupFailure> {
    let fatal = |cancelled: bool| {
        elements
            .iter()
            .zip(outcomes)
            .find(|(_, o)| o.is_fatal() && o.is_cancelled() == cancelled)
            .map(|(r, o)| GroupFailure::Fatal {
                element: r.to_string(),
                code: o.code,
                reason: o.reason(),
            })
    };
    fatal(false).or_else(|| fatal(true))
}

/// Number of trials, saturating at `usize::MAX`.
fn trial_count(candidates: &[Candidate<'_>]) -> usize {
    candidates
        .iter()
        .try_fold(1usize, |total, c| total.checked_mul(c.options.len()))
        .unwrap_or(usize::MAX)
}

/// Every choice of plan option per candidate; the first candidate varies slowest.
fn combinations(candidates: &[Candidate<'_>]) -> impl Iterator<Item = Vec<usize>> {
    let radices: Vec<usize> = candidates.iter().map(|c| c.options.len()).collect();
    let mut next = Some(vec![0; radices.len()]);

    std::iter::from_fn(move || {
        let current = next.take()?;
        let mut advanced = current.clone();
        for position in (0..advanced.len()).rev() {
            advanced[position] += 1;
            if advanced[position] < radices[position] {
                next = Some(advanced);
                break;
            }
            advanced[position] = 0;
        }
        Some(current)
    })
}

fn run_trial(candidates: &[Candidate<'_>], sections: &[&PlanSections]) -> Result<DetectResult, GroupFailure> {
    let mut live = vec![true; candidates.len()];

    loop {
        let unmet = sections
            .iter()
            .enumerate()
            .filter(|(index, _)| live[*index])
            .find_map(|(index, section)| {
                section
                    .requires
                    .iter()
                    .find(|r| !is_provided(sections, &live, &r.name))
                    .map(|r| (index, r.name.clone()))
            });
        let Some((index, requirement)) = unmet else {
            break;
        };

        let reference = candidates[index].reference;
        if !reference.optional {
            return Err(GroupFailure::Unsatisfied {
                element: reference.to_string(),
                requirement,
            });
        }
        debug!(element = %reference, %requirement, "skip: unmet requirement");
        live[index] = false;
    }

    if !candidates
        .iter()
        .zip(&live)
        .any(|(c, &alive)| alive && !c.reference.is_extension())
    {
        return Err(GroupFailure::NoViableBuildpacks);
    }

    Ok(DetectResult {
        group: resolved_group(candidates, &live),
        plan: build_plan(candidates, sections, &live),
    })
}

fn is_provided(sections: &[&PlanSections], live: &[bool], name: &str) -> bool {
    sections
        .iter()
        .zip(live)
        .any(|(s, &alive)| alive && s.provides_name(name))
}

fn resolved_group(candidates: &[Candidate<'_>], live: &[bool]) -> ResolvedGroup {
    let mut group = ResolvedGroup::default();
    for (candidate, _) in candidates.iter().zip(live).filter(|(_, &alive)| alive) {
        let reference = candidate.reference.no_opt();
        if reference.is_extension() {
            group.group_extensions.push(reference);
        } else {
            group.group.push(reference);
        }
    }
    group
}

fn build_plan(candidates: &[Candidate<'_>], sections: &[&PlanSections], live: &[bool]) -> BuildPlan {
    let mut plan = BuildPlan::default();

    for (index, section) in sections.iter().enumerate() {
        if !live[index] {
            continue;
        }
        for require in &section.requires {
            let position = match plan.entries.iter().position(|e| e.name == require.name) {
                Some(position) => position,
                None => {
                    let providers = candidates
                        .iter()
                        .zip(sections)
                        .zip(live)
                        .filter(|((_, s), &alive)| alive && s.provides_name(&require.name))
                        .map(|((c, _), _)| c.reference.no_opt())
                        .collect();
                    plan.entries.push(BuildPlanEntry {
                        name: require.name.clone(),
                        providers,
                        requires: Vec::new(),
                    });
                    plan.entries.len() - 1
                }
            };
            plan.entries[position].requires.push(require.clone());
        }
    }

    plan
}
