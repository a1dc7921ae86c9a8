//! Network outcome object

use crate::error::RestError;
use http::{HeaderMap, StatusCode, header};
use serde_json::{Value, json};
use shared::{FailureCategory, ProblemDetails};

/// What was received for one HTTP call
#[derive(Debug, Clone, PartialEq)]
pub struct HttpSnapshot {
    /// URL the request was sent to
    pub url: String,
    pub status: StatusCode,
    /// Canonical reason phrase of `status`
    pub reason: String,
    pub headers: HeaderMap,
    /// Raw body text
    pub text: String,
    /// Body decoded as JSON, `None` for empty or non-JSON bodies
    pub json: Option<Value>,
}

impl HttpSnapshot {
    /// `Location` header, if present and valid UTF-8
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    pub fn has_body(&self) -> bool {
        self.status != StatusCode::NO_CONTENT && !self.text.is_empty()
    }
}

/// Result of one REST call
///
/// Fields are read through accessors; a successful outcome never carries an
/// error. `http_status` defaults to 500.
#[derive(Debug, Clone, PartialEq)]
pub struct RestReturn {
    success: bool,
    message: Option<String>,
    http_status: StatusCode,
    json_body: Option<Value>,
    response: Option<HttpSnapshot>,
    error: Option<RestError>,
}

impl Default for RestReturn {
    fn default() -> Self {
        Self {
            success: false,
            message: None,
            http_status: StatusCode::INTERNAL_SERVER_ERROR,
            json_body: None,
            response: None,
            error: None,
        }
    }
}

impl RestReturn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Failed outcome for `status`, with its reason phrase as message
    pub fn failure(status: StatusCode) -> Self {
        Self::new()
            .with_status(status)
            .with_message(status.canonical_reason().unwrap_or_default())
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn http_status(&self) -> StatusCode {
        self.http_status
    }

    pub fn json_body(&self) -> Option<&Value> {
        self.json_body.as_ref()
    }

    /// Snapshot of the last HTTP response
    pub fn response(&self) -> Option<&HttpSnapshot> {
        self.response.as_ref()
    }

    pub fn error(&self) -> Option<&RestError> {
        self.error.as_ref()
    }

    pub fn category(&self) -> Option<FailureCategory> {
        self.error.as_ref().map(RestError::category)
    }

    /// `Location` header of the response
    pub fn location(&self) -> Option<&str> {
        self.response.as_ref().and_then(HttpSnapshot::location)
    }

    pub fn with_success(mut self, success: bool) -> Self {
        self.success = success;
        if success {
            self.error = None;
        }
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.http_status = status;
        self
    }

    pub fn with_json_body(mut self, body: impl Into<Option<Value>>) -> Self {
        self.json_body = body.into();
        self
    }

    pub fn with_response(mut self, response: HttpSnapshot) -> Self {
        self.response = Some(response);
        self
    }

    pub fn with_error(mut self, error: RestError) -> Self {
        self.success = false;
        self.error = Some(error);
        self
    }

    /// JSON projection: `{success, message, http_status, json}`
    pub fn to_json(&self) -> Value {
        json!({
            "success": self.success,
            "message": self.message,
            "http_status": self.http_status.as_u16(),
            "json": self.json_body,
        })
    }

    /// Problem details mirroring a failed outcome
    pub fn to_problem(&self) -> Option<ProblemDetails> {
        if self.success {
            return None;
        }
        let mut problem = ProblemDetails::from_status(self.http_status);
        if let Some(category) = self.category() {
            problem = problem.with_type(format!("urn:magen:rest:{category}"));
        }
        if let Some(url) = self.response.as_ref().map(|r| r.url.as_str()) {
            problem = problem.with_instance(url);
        }
        if let Some(detail) = self.json_body.as_ref().and_then(|b| b.get("detail")).and_then(Value::as_str) {
            problem = problem.with_detail(detail);
        }
        Some(problem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let outcome = RestReturn::new();
        assert!(!outcome.success());
        assert_eq!(outcome.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(outcome.json_body().is_none());
        assert!(outcome.response().is_none());
    }

    #[test]
    fn test_success_invariant() {
        let outcome = RestReturn::new()
            .with_error(RestError::Unknown(None))
            .with_success(true);
        assert!(outcome.error().is_none());

        let outcome = RestReturn::new()
            .with_success(true)
            .with_error(RestError::Timeout("slow".into()));
        assert!(!outcome.success());
    }

    #[test]
    fn test_to_json() {
        let outcome = RestReturn::new()
            .with_success(true)
            .with_status(StatusCode::CREATED)
            .with_message("Created")
            .with_json_body(json!({"uuid": "x"}));
        assert_eq!(
            outcome.to_json(),
            json!({
                "success": true,
                "message": "Created",
                "http_status": 201,
                "json": {"uuid": "x"},
            })
        );
    }

    #[test]
    fn test_to_problem() {
        let outcome = RestReturn::failure(StatusCode::SERVICE_UNAVAILABLE)
            .with_error(RestError::Connection("refused".into()));
        let problem = outcome.to_problem().unwrap();
        assert_eq!(problem.status, Some(503));
        assert_eq!(problem.title.as_deref(), Some("Service Unavailable"));
        assert_eq!(problem.type_or_blank(), "urn:magen:rest:service_unavailable");
        assert!(RestReturn::new().with_success(true).to_problem().is_none());
    }
}
