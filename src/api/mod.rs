//! Buildpack API versions and the set of APIs the engine implements.

mod apis;
mod version;

pub use apis::{
    ApiSet, DeprecationMode, DEPRECATED_BUILDPACK_APIS, SUPPORTED_BUILDPACK_APIS,
};
pub use version::ApiVersion;

use crate::order::Kind;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("invalid API version '{0}'")]
    Parse(String),

    #[error("invalid deprecated API '{0}'")]
    InvalidDeprecated(String),

    #[error("invalid deprecation mode '{0}'. Valid options: quiet, warn, error")]
    InvalidDeprecationMode(String),

    #[error("set API for {kind} '{id}': buildpack API version '{requested}' is incompatible with the lifecycle")]
    Unsupported {
        kind: Kind,
        id: String,
        requested: String,
    },

    #[error("{kind} '{id}' requests deprecated API '{requested}' and deprecated APIs are disabled")]
    Deprecated {
        kind: Kind,
        id: String,
        requested: String,
    },
}
