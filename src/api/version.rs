use super::ApiError;
use std::fmt;
use std::str::FromStr;

/// A buildpack API version such as `0.9` or `1`.
///
/// A bare major (`"1"`) parses as `1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ApiVersion {
    pub major: u64,
    pub minor: u64,
}

impl ApiVersion {
    pub const fn new(major: u64, minor: u64) -> Self {
        Self { major, minor }
    }

    pub fn parse(s: &str) -> Result<Self, ApiError> {
        let invalid = || ApiError::Parse(s.to_string());
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(invalid());
        }

        let mut parts = trimmed.splitn(2, '.');
        let major = parts
            .next()
            .and_then(|m| m.parse::<u64>().ok())
            .ok_or_else(invalid)?;
        let minor = match parts.next() {
            Some(m) => m.parse::<u64>().map_err(|_| invalid())?,
            None => 0,
        };

        Ok(Self { major, minor })
    }

    pub fn is_stable(&self) -> bool {
        self.major > 0
    }

    /// Whether a module requesting `self` can run on an engine implementing `engine`.
    ///
    /// Pre-stable versions must match exactly. Stable versions must share the
    /// major, and the engine minor must be at least the requested minor.
    pub fn is_compatible_with(&self, engine: &ApiVersion) -> bool {
        if !self.is_stable() || !engine.is_stable() {
            return self == engine;
        }
        self.major == engine.major && self.minor <= engine.minor
    }

    pub fn at_least(&self, other: ApiVersion) -> bool {
        *self >= other
    }
}

impl FromStr for ApiVersion {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
