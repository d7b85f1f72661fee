use super::FailureReport;
use crate::api::ApiError;
use crate::order::OrderError;
use crate::store::StoreError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Why a single candidate group did not detect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroupFailure {
    Empty,
    /// A non-optional element exited 100.
    Detection { element: String },
    /// A non-optional element requires a name nobody in the live set provides.
    Unsatisfied {
        element: String,
        requirement: String,
    },
    /// Only extensions survived.
    NoViableBuildpacks,
    /// A probe failed in a way other than declining.
    Fatal {
        element: String,
        code: i32,
        reason: String,
    },
}

impl GroupFailure {
    pub fn is_fatal(&self) -> bool {
        matches!(self, GroupFailure::Fatal { .. })
    }
}

impl fmt::Display for GroupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupFailure::Empty => write!(f, "empty group"),
            GroupFailure::Detection { element } => write!(f, "{element} failed detection"),
            GroupFailure::Unsatisfied {
                element,
                requirement,
            } => write!(f, "{element} requires {requirement}"),
            GroupFailure::NoViableBuildpacks => write!(f, "no viable buildpacks in group"),
            GroupFailure::Fatal {
                element,
                code,
                reason,
            } => write!(f, "{element} ({code}): {reason}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DetectError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error("group [{group}] failed: {failure}")]
    Fatal {
        group: String,
        failure: GroupFailure,
    },

    #[error("no buildpack groups passed detection")]
    NoGroupDetected(FailureReport),

    #[error("detection was cancelled")]
    Cancelled,
}

impl DetectError {
    /// Errors caused by the order, the descriptors or the API set rather than
    /// by what the probes reported.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            DetectError::Api(_) | DetectError::Store(_) | DetectError::Order(_)
        )
    }

    pub fn is_incompatible_api(&self) -> bool {
        matches!(
            self,
            DetectError::Api(ApiError::Unsupported { .. } | ApiError::Deprecated { .. })
        )
    }
}
