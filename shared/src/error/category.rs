//! Failure category classification

use serde::{Deserialize, Serialize};

/// Category of a failed storage or network call
///
/// Categories follow the taxonomy used by both error translators:
/// - transient infrastructure errors (timeouts, refused connections)
/// - malformed input (invalid URL scheme, bad filter or update document)
/// - failures reported by the server with a code or body
/// - partial failures of a bulk write
/// - anything unclassified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// Timeouts and connection failures
    ServiceUnavailable,
    /// Request could not be built or was rejected as malformed
    BadRequest,
    /// The server answered with an error status or driver error code
    ServerReported,
    /// Some items of a bulk write failed
    PartialFailure,
    /// Unclassified failure
    Internal,
}

impl FailureCategory {
    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::ServiceUnavailable => "service_unavailable",
            Self::BadRequest => "bad_request",
            Self::ServerReported => "server_reported",
            Self::PartialFailure => "partial_failure",
            Self::Internal => "internal",
        }
    }

    /// Whether a caller may reasonably try the same call again later
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ServiceUnavailable)
    }
}

impl std::fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_name() {
        assert_eq!(
            FailureCategory::ServiceUnavailable.name(),
            "service_unavailable"
        );
        assert_eq!(FailureCategory::BadRequest.name(), "bad_request");
        assert_eq!(FailureCategory::ServerReported.name(), "server_reported");
        assert_eq!(FailureCategory::PartialFailure.name(), "partial_failure");
        assert_eq!(FailureCategory::Internal.name(), "internal");
    }

    #[test]
    fn test_only_unavailable_is_transient() {
        assert!(FailureCategory::ServiceUnavailable.is_transient());
        assert!(!FailureCategory::BadRequest.is_transient());
        assert!(!FailureCategory::PartialFailure.is_transient());
        assert!(!FailureCategory::Internal.is_transient());
    }

    #[test]
    fn test_category_serde() {
        let json = serde_json::to_string(&FailureCategory::PartialFailure).unwrap();
        assert_eq!(json, "\"partial_failure\"");

        let category: FailureCategory = serde_json::from_str("\"bad_request\"").unwrap();
        assert_eq!(category, FailureCategory::BadRequest);
    }
}
