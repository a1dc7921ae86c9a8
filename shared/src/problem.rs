//! RFC 7807 problem details
//!
//! JSON error body used when a failed outcome crosses an HTTP-server
//! boundary. Members:
//!
//! - `type`: URI reference identifying the problem type (`about:blank` when absent)
//! - `title`: short, human-readable summary of the problem type
//! - `status`: HTTP status code generated by the origin server
//! - `detail`: explanation specific to this occurrence
//! - `instance`: URI reference identifying this occurrence

use crate::error::FailureCategory;
use axum::{
    Json,
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use http::StatusCode;
use serde::{Deserialize, Serialize};

/// Media type for problem detail bodies
pub const PROBLEM_JSON: &str = "application/problem+json";

/// Problem details object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemDetails {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

impl ProblemDetails {
    /// Problem for a status, titled with its canonical reason
    pub fn from_status(status: StatusCode) -> Self {
        Self {
            title: status.canonical_reason().map(str::to_string),
            status: Some(status.as_u16()),
            ..Default::default()
        }
    }

    /// Problem for a failure category
    pub fn from_category(category: FailureCategory) -> Self {
        Self::from_status(category.http_status())
    }

    pub fn with_type(mut self, type_uri: impl Into<String>) -> Self {
        self.type_uri = Some(type_uri.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Status as a [`StatusCode`], 500 when missing or invalid
    pub fn status_code(&self) -> StatusCode {
        self.status
            .and_then(|s| StatusCode::from_u16(s).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// The `type` member, defaulting to `about:blank`
    pub fn type_or_blank(&self) -> &str {
        self.type_uri.as_deref().unwrap_or("about:blank")
    }
}

impl IntoResponse for ProblemDetails {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut response = (status, Json(self)).into_response();
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(PROBLEM_JSON));
        response
    }
}
