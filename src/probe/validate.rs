use super::{DetectionOutcome, ProbeError, CODE_NO_STATUS};
use crate::order::Kind;
use crate::store::Descriptor;
use tracing::warn;

/// Applies the build plan rules to a passing outcome. Anything else is
/// returned untouched.
pub fn validate_outcome(descriptor: &Descriptor, mut outcome: DetectionOutcome) -> DetectionOutcome {
    if !outcome.is_pass() {
        return outcome;
    }

    let kind = descriptor.kind;
    let id = &descriptor.info.id;
    let invalid = |outcome: DetectionOutcome, message: String| DetectionOutcome {
        code: CODE_NO_STATUS,
        error: Some(ProbeError::InvalidPlan(message)),
        ..outcome
    };

    if outcome.plan.has_doubly_specified_versions() {
        return invalid(
            outcome,
            format!(
                r#"{kind} {id} has a "version" key and a "metadata.version" which cannot be specified together. "metadata.version" should be used instead"#
            ),
        );
    }

    if kind == Kind::Extension && outcome.plan.has_requires() {
        return invalid(
            outcome,
            format!(r#"{kind} {id} outputs "requires" which is not allowed"#),
        );
    }

    if outcome.plan.has_top_level_versions() {
        warn!(
            %kind,
            id = %id,
            r#"Plan has a "version" key. This key is deprecated in build plan requirements; "metadata.version" should be used instead"#
        );
        outcome.plan.convert_versions_to_metadata();
    }

    outcome
}
