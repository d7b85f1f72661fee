use super::GroupFailure;
use crate::order::Reference;
use crate::plan::BuildPlan;
use serde::Serialize;
use std::fmt;

/// A group that detected: buildpacks in input order, then extensions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedGroup {
    pub group: Vec<Reference>,
    pub group_extensions: Vec<Reference>,
}

impl ResolvedGroup {
    pub fn len(&self) -> usize {
        self.group.len() + self.group_extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> Vec<String> {
        self.group
            .iter()
            .chain(self.group_extensions.iter())
            .map(|r| r.to_string())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetectResult {
    pub group: ResolvedGroup,
    pub plan: BuildPlan,
}

/// One candidate group that was evaluated and failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupAttempt {
    /// Position in the flattened candidate list.
    pub index: usize,
    pub group: Vec<String>,
    pub failure: GroupFailure,
}

/// Every failed attempt of a resolve call, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FailureReport {
    pub attempts: Vec<GroupAttempt>,
}

impl FailureReport {
    pub fn push(&mut self, index: usize, group: &[Reference], failure: GroupFailure) {
        self.attempts.push(GroupAttempt {
            index,
            group: group.iter().map(|r| r.to_string()).collect(),
            failure,
        });
    }

    /// Whether any attempt failed because a probe errored.
    pub fn has_errors(&self) -> bool {
        self.attempts.iter().any(|a| a.failure.is_fatal())
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attempts.is_empty() {
            return writeln!(f, "no groups were attempted");
        }
        for attempt in &self.attempts {
            writeln!(
                f,
                "group #{} [{}]: {}",
                attempt.index + 1,
                attempt.group.join(", "),
                attempt.failure
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_display_and_errors() {
        let mut report = FailureReport::default();
        report.push(
            0,
            &[Reference::new("A", "v1"), Reference::new("B", "v1")],
            GroupFailure::Detection {
                element: "A@v1".to_string(),
            },
        );
        assert!(!report.has_errors());

        report.push(
            1,
            &[Reference::new("C", "v1")],
            GroupFailure::Fatal {
                element: "C@v1".to_string(),
                code: 17,
                reason: "detect exited with code 17".to_string(),
            },
        );
        assert!(report.has_errors());

        assert_eq!(
            report.to_string(),
            "group #1 [A@v1, B@v1]: A@v1 failed detection\n\
             group #2 [C@v1]: C@v1 (17): detect exited with code 17\n"
        );
    }

    #[test]
    fn test_resolved_group_ids() {
        let group = ResolvedGroup {
            group: vec![Reference::new("A", "v1")],
            group_extensions: vec![Reference::extension("E", "v1")],
        };
        assert_eq!(group.ids(), vec!["A@v1", "E@v1"]);
        assert_eq!(group.len(), 2);
    }
}
