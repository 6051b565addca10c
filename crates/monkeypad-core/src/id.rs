//! Opaque identifier assigned to code samples by the service.

use std::fmt;

use serde::Serialize;

/// Service-assigned code sample identifier.
///
/// The service may encode ids as JSON strings or numbers; both normalize to
/// the same textual form so `42` and `"42"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SampleId(pub String);

impl SampleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SampleId {
    fn from(s: &str) -> Self {
        SampleId(s.to_string())
    }
}

impl From<String> for SampleId {
    fn from(s: String) -> Self {
        SampleId(s)
    }
}

impl From<u64> for SampleId {
    fn from(n: u64) -> Self {
        SampleId(n.to_string())
    }
}
