//! REST error kinds and translation

use crate::outcome::{HttpSnapshot, RestReturn};
use http::StatusCode;
use serde_json::Value;
use shared::FailureCategory;
use thiserror::Error;

/// REST call error kinds
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RestError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Refused, reset or unreachable
    #[error("Connection error: {0}")]
    Connection(String),

    /// Invalid URL or unsupported scheme
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// The server answered with a 4xx or 5xx status
    #[error("HTTP error: {status}")]
    Status {
        status: StatusCode,
        /// Error body, when it decodes as JSON
        body: Option<Value>,
        response: Box<HttpSnapshot>,
    },

    #[error("Too many redirects: {0}")]
    TooManyRedirects(String),

    /// Response body is not valid JSON
    #[error("Invalid JSON in response: {0}")]
    Decode(String),

    #[error("Unexpected error: {}", .0.as_deref().unwrap_or_default())]
    Unknown(Option<String>),
}

impl RestError {
    pub fn category(&self) -> FailureCategory {
        match self {
            Self::Timeout(_) | Self::Connection(_) => FailureCategory::ServiceUnavailable,
            Self::MalformedRequest(_) => FailureCategory::BadRequest,
            Self::Status { .. } => FailureCategory::ServerReported,
            Self::TooManyRedirects(_) | Self::Decode(_) | Self::Unknown(_) => {
                FailureCategory::Internal
            }
        }
    }

    /// Build the error for an HTTP error response
    pub fn from_response(response: HttpSnapshot) -> Self {
        Self::Status {
            status: response.status,
            body: response.json.clone(),
            response: Box::new(response),
        }
    }
}

impl From<reqwest::Error> for RestError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        if err.is_timeout() {
            RestError::Timeout(message)
        } else if err.is_connect() {
            RestError::Connection(message)
        } else if err.is_redirect() {
            RestError::TooManyRedirects(message)
        } else if err.is_builder() {
            RestError::MalformedRequest(message)
        } else if err.is_decode() {
            RestError::Decode(message)
        } else if err.is_request() || err.is_body() {
            RestError::Connection(message)
        } else {
            RestError::Unknown(Some(message))
        }
    }
}

impl From<serde_json::Error> for RestError {
    fn from(err: serde_json::Error) -> Self {
        RestError::Decode(err.to_string())
    }
}

/// Translate a REST error into a failed outcome
///
/// | kind | status | message |
/// |------|--------|---------|
/// | timeout, connection | 503 | reason phrase |
/// | malformed request | 400 | reason phrase |
/// | HTTP error status | the status | reason phrase, JSON body kept |
/// | redirects, decode | 500 | reason phrase |
/// | unknown | 500 | error text, empty when none |
pub fn handle_rest_error(err: RestError) -> RestReturn {
    tracing::error!(category = %err.category(), "REST call failed: {}", err);

    let outcome = match &err {
        RestError::Timeout(_) | RestError::Connection(_) => {
            RestReturn::failure(StatusCode::SERVICE_UNAVAILABLE)
        }
        RestError::MalformedRequest(_) => RestReturn::failure(StatusCode::BAD_REQUEST),
        RestError::Status {
            status,
            body,
            response,
        } => RestReturn::failure(*status)
            .with_message(response.reason.clone())
            .with_json_body(body.clone())
            .with_response(response.as_ref().clone()),
        RestError::TooManyRedirects(_) | RestError::Decode(_) => {
            RestReturn::failure(StatusCode::INTERNAL_SERVER_ERROR)
        }
        RestError::Unknown(message) => RestReturn::failure(StatusCode::INTERNAL_SERVER_ERROR)
            .with_message(message.clone().unwrap_or_default()),
    };
    outcome.with_error(err)
}
