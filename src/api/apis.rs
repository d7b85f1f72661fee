use super::{ApiError, ApiVersion};
use crate::order::Kind;
use std::fmt;
use std::str::FromStr;
use tracing::{error, warn};

/// Buildpack APIs implemented by this engine.
pub const SUPPORTED_BUILDPACK_APIS: &[&str] = &["0.7", "0.8", "0.9", "0.10", "0.11"];

/// Buildpack APIs still accepted but scheduled for removal.
pub const DEPRECATED_BUILDPACK_APIS: &[&str] = &[];

/// How requests for a deprecated API are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeprecationMode {
    Quiet,
    #[default]
    Warn,
    Error,
}

impl FromStr for DeprecationMode {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "quiet" => Ok(Self::Quiet),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(ApiError::InvalidDeprecationMode(other.to_string())),
        }
    }
}

impl fmt::Display for DeprecationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Quiet => "quiet",
            Self::Warn => "warn",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// The set of buildpack APIs an engine supports, plus the deprecated subset.
///
/// This is an immutable value handed to the evaluator at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSet {
    supported: Vec<ApiVersion>,
    deprecated: Vec<ApiVersion>,
}

impl ApiSet {
    pub fn new(supported: &[&str], deprecated: &[&str]) -> Result<Self, ApiError> {
        let supported = supported
            .iter()
            .map(|s| ApiVersion::parse(s))
            .collect::<Result<Vec<_>, _>>()?;

        let mut set = Self {
            supported,
            deprecated: Vec::with_capacity(deprecated.len()),
        };

        for raw in deprecated {
            let version = ApiVersion::parse(raw)?;
            // A stable deprecation covers a whole major.
            if version.is_stable() && version.minor != 0 {
                return Err(ApiError::InvalidDeprecated(raw.to_string()));
            }
            if !set.is_supported(version) {
                return Err(ApiError::InvalidDeprecated(raw.to_string()));
            }
            set.deprecated.push(version);
        }

        Ok(set)
    }

    /// The buildpack API set this engine ships with.
    pub fn buildpack() -> Self {
        let parse = |list: &[&str]| {
            list.iter()
                .filter_map(|s| ApiVersion::parse(s).ok())
                .collect::<Vec<_>>()
        };
        Self {
            supported: parse(SUPPORTED_BUILDPACK_APIS),
            deprecated: parse(DEPRECATED_BUILDPACK_APIS),
        }
    }

    pub fn supported(&self) -> &[ApiVersion] {
        &self.supported
    }

    pub fn is_supported(&self, requested: ApiVersion) -> bool {
        self.supported
            .iter()
            .any(|engine| requested.is_compatible_with(engine))
    }

    pub fn is_deprecated(&self, requested: ApiVersion) -> bool {
        self.deprecated.iter().any(|d| {
            if d.is_stable() {
                d.major == requested.major
            } else {
                *d == requested
            }
        })
    }

    /// Checks the API a buildpack or extension declares against this set.
    pub fn verify(
        &self,
        kind: Kind,
        id: &str,
        requested: &str,
        mode: DeprecationMode,
    ) -> Result<ApiVersion, ApiError> {
        let version = ApiVersion::parse(requested).map_err(|_| ApiError::Unsupported {
            kind,
            id: id.to_string(),
            requested: requested.to_string(),
        })?;

        if !self.is_supported(version) {
            return Err(ApiError::Unsupported {
                kind,
                id: id.to_string(),
                requested: requested.to_string(),
            });
        }

        if self.is_deprecated(version) {
            match mode {
                DeprecationMode::Quiet => {}
                DeprecationMode::Warn => {
                    warn!(%kind, id, api = requested, "module requests deprecated API");
                }
                DeprecationMode::Error => {
                    error!(%kind, id, api = requested, "module requests deprecated API");
                    return Err(ApiError::Deprecated {
                        kind,
                        id: id.to_string(),
                        requested: requested.to_string(),
                    });
                }
            }
        }

        Ok(version)
    }
}

impl Default for ApiSet {
    fn default() -> Self {
        Self::buildpack()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> ApiVersion {
        ApiVersion::parse(s).unwrap()
    }

    fn sample() -> ApiSet {
        ApiSet::new(&["0.2", "0.3", "1.3", "2.1"], &["0.2", "0.3", "1"]).unwrap()
    }

    #[test]
    fn test_deprecated_stable_with_minor_is_rejected() {
        let err = ApiSet::new(&["1.3"], &["1.2"]).unwrap_err();
        assert_eq!(err.to_string(), "invalid deprecated API '1.2'");
    }

    #[test]
    fn test_deprecated_must_be_supported() {
        let err = ApiSet::new(&["1.3"], &["0.4"]).unwrap_err();
        assert_eq!(err.to_string(), "invalid deprecated API '0.4'");
    }

    #[test]
    fn test_is_supported() {
        let apis = sample();
        for a in ["0.2", "0.3", "1", "1.0", "1.1", "1.2", "1.3", "2", "2.0", "2.1"] {
            assert!(apis.is_supported(v(a)), "{a} should be supported");
        }
        for a in ["0.1", "0.4", "1.4", "2.2", "3"] {
            assert!(!apis.is_supported(v(a)), "{a} should not be supported");
        }
    }

    #[test]
    fn test_is_deprecated() {
        let apis = sample();
        for a in ["0.2", "0.3", "1", "1.0", "1.1", "1.2", "1.3"] {
            assert!(apis.is_deprecated(v(a)), "{a} should be deprecated");
        }
        for a in ["2", "2.0", "2.1"] {
            assert!(!apis.is_deprecated(v(a)), "{a} should not be deprecated");
        }
    }

    #[test]
    fn test_verify_unsupported_is_error() {
        let apis = ApiSet::buildpack();
        let err = apis
            .verify(Kind::Buildpack, "acme/node", "0.1", DeprecationMode::Warn)
            .unwrap_err();
        assert!(matches!(err, ApiError::Unsupported { .. }));
        assert!(err.to_string().contains("acme/node"));
    }

    #[test]
    fn test_verify_unparsable_is_unsupported() {
        let apis = ApiSet::buildpack();
        let err = apis
            .verify(Kind::Extension, "acme/ext", "latest", DeprecationMode::Warn)
            .unwrap_err();
        assert!(matches!(err, ApiError::Unsupported { .. }));
    }

    #[test]
    fn test_verify_deprecated_modes() {
        let apis = sample();
        assert!(apis
            .verify(Kind::Buildpack, "a", "0.2", DeprecationMode::Quiet)
            .is_ok());
        assert!(apis
            .verify(Kind::Buildpack, "a", "0.2", DeprecationMode::Warn)
            .is_ok());
        let err = apis
            .verify(Kind::Buildpack, "a", "0.2", DeprecationMode::Error)
            .unwrap_err();
        assert!(matches!(err, ApiError::Deprecated { .. }));
    }

    #[test]
    fn test_default_set_supports_current_apis() {
        let apis = ApiSet::default();
        assert!(apis.is_supported(v("0.9")));
        assert!(apis.is_supported(v("0.11")));
        assert!(!apis.is_supported(v("0.6")));
    }

    #[test]
    fn test_deprecation_mode_from_str() {
        assert_eq!("QUIET".parse::<DeprecationMode>().unwrap(), DeprecationMode::Quiet);
        assert_eq!("warn".parse::<DeprecationMode>().unwrap(), DeprecationMode::Warn);
        assert_eq!("error".parse::<DeprecationMode>().unwrap(), DeprecationMode::Error);
        assert!("loud".parse::<DeprecationMode>().is_err());
    }
}
