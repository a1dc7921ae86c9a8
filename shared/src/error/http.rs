//! HTTP status code mapping for failure categories

use super::category::FailureCategory;
use http::StatusCode;

impl FailureCategory {
    /// Get the HTTP status a failure of this category maps to
    ///
    /// `ServerReported` failures normally carry their own status; this is the
    /// fallback used when the server gave none (e.g. a driver error code).
    pub fn http_status(&self) -> StatusCode {
        match self {
            // 503 Service Unavailable (transient errors, client can retry)
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            // 400 Bad Request
            Self::BadRequest => StatusCode::BAD_REQUEST,

            // 500 Internal Server Error
            Self::ServerReported | Self::PartialFailure | Self::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Canonical reason phrase for [`Self::http_status`]
    pub fn reason(&self) -> &'static str {
        self.http_status().canonical_reason().unwrap_or_default()
    }
}
