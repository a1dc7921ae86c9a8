//! REST client verbs
//!
//! Each verb performs one round trip and returns a [`RestReturn`]. Errors
//! never escape: transport failures and 4xx/5xx responses are translated by
//! [`handle_rest_error`].

use crate::config::RestClientConfig;
use crate::error::{RestError, handle_rest_error};
use crate::outcome::{HttpSnapshot, RestReturn};
use http::{HeaderValue, Method, StatusCode, header};
use reqwest::{Client, Url};
use serde_json::Value;
use shared::{MagenConfig, Verdict};
use std::time::Duration;

const APPLICATION_JSON: &str = "application/json";

/// Application-level check of a response
///
/// Overrides the success flag, message and status the verb reports.
pub type ResponseCheck = dyn Fn(&HttpSnapshot) -> Verdict + Send + Sync;

/// Per-call options
#[derive(Default, Clone, Copy)]
pub struct CallOptions<'a> {
    /// Overrides the client timeout
    pub timeout: Option<Duration>,
    pub check: Option<&'a ResponseCheck>,
}

impl<'a> CallOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn check(mut self, check: &'a ResponseCheck) -> Self {
        self.check = Some(check);
        self
    }
}

/// JSON REST client
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    config: RestClientConfig,
}

impl RestClient {
    /// Create a client from configuration
    pub fn new(config: RestClientConfig) -> Result<Self, RestError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()?;
        Ok(Self { client, config })
    }

    /// Create a client from the service configuration
    pub fn from_magen(config: &MagenConfig) -> Result<Self, RestError> {
        Self::new(RestClientConfig::from_magen(config))
    }

    pub fn config(&self) -> &RestClientConfig {
        &self.config
    }

    // ========== Verbs ==========

    pub async fn get(&self, url: &str) -> RestReturn {
        self.get_with(url, &CallOptions::default()).await
    }

    /// GET with per-call options
    pub async fn get_with(&self, url: &str, options: &CallOptions<'_>) -> RestReturn {
        self.execute(Method::GET, url, None, options).await
    }

    /// POST a JSON body
    ///
    /// The server must answer with a `Location` header; without one the call
    /// fails with 500 whatever the status was.
    pub async fn post(&self, url: &str, body: &Value) -> RestReturn {
        self.post_with(url, body, &CallOptions::default()).await
    }

    pub async fn post_with(&self, url: &str, body: &Value, options: &CallOptions<'_>) -> RestReturn {
        self.execute(Method::POST, url, Some(body), options).await
    }

    pub async fn put(&self, url: &str, body: &Value) -> RestReturn {
        self.put_with(url, body, &CallOptions::default()).await
    }

    pub async fn put_with(&self, url: &str, body: &Value, options: &CallOptions<'_>) -> RestReturn {
        self.execute(Method::PUT, url, Some(body), options).await
    }

    pub async fn delete(&self, url: &str) -> RestReturn {
        self.delete_with(url, &CallOptions::default()).await
    }

    pub async fn delete_with(&self, url: &str, options: &CallOptions<'_>) -> RestReturn {
        self.execute(Method::DELETE, url, None, options).await
    }

    // ========== Internals ==========

    async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        options: &CallOptions<'_>,
    ) -> RestReturn {
        let require_location = method == Method::POST;
        let response = match self.send(method.clone(), url, body, options.timeout).await {
            Ok(response) => response,
            Err(err) => return handle_rest_error(err),
        };

        if require_location && response.location().is_none() {
            tracing::warn!(url = %url, status = %response.status, "POST response has no Location header");
            return RestReturn::failure(StatusCode::INTERNAL_SERVER_ERROR).with_response(response);
        }

        let verdict = match options.check {
            Some(check) => check(&response),
            None => Verdict::new(true, response.reason.clone(), response.status),
        };
        tracing::debug!(
            method = %method,
            url = %url,
            status = %response.status,
            success = verdict.success,
            "REST call completed"
        );

        RestReturn::new()
            .with_success(verdict.success)
            .with_message(verdict.message)
            .with_status(verdict.status)
            .with_json_body(response.json.clone())
            .with_response(response)
    }

    /// One round trip, classified
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        timeout: Option<Duration>,
    ) -> Result<HttpSnapshot, RestError> {
        let target = parse_url(url)?;

        let mut request = self
            .client
            .request(method, target)
            .header(header::ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
        if let Some(body) = body {
            request = request
                .header(header::CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON))
                .body(serde_json::to_vec(body)?);
        }
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let final_url = response.url().to_string();
        let text = response.text().await?;

        let mut snapshot = HttpSnapshot {
            url: final_url,
            status,
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            text,
            json: None,
        };

        if status.is_client_error() || status.is_server_error() {
            snapshot.json = serde_json::from_str(&snapshot.text).ok();
            return Err(RestError::from_response(snapshot));
        }

        if snapshot.has_body() {
            snapshot.json = Some(serde_json::from_str(&snapshot.text)?);
        }
        Ok(snapshot)
    }
}

/// Validate a request URL: absolute, with an http or https scheme
pub fn parse_url(url: &str) -> Result<Url, RestError> {
    let parsed = Url::parse(url)
        .map_err(|e| RestError::MalformedRequest(format!("Invalid URL '{url}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(RestError::MalformedRequest(format!(
            "No connection adapters were found for scheme '{scheme}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url() {
        assert!(parse_url("http://localhost:5000/x/").is_ok());
        assert!(parse_url("https://example.com").is_ok());
        assert!(matches!(
            parse_url("localhost:5000/x"),
            Err(RestError::MalformedRequest(_))
        ));
        assert!(matches!(
            parse_url("/relative/path"),
            Err(RestError::MalformedRequest(_))
        ));
        assert!(matches!(
            parse_url("ftp://example.com/file"),
            Err(RestError::MalformedRequest(_))
        ));
    }

    #[test]
    fn test_call_options() {
        let check: &ResponseCheck = &|_| Verdict::ok();
        let options = CallOptions::new()
            .timeout(Duration::from_millis(10))
            .check(check);
        assert_eq!(options.timeout, Some(Duration::from_millis(10)));
        assert!(options.check.is_some());
    }

    #[tokio::test]
    async fn test_malformed_url_never_reaches_network() {
        let client = RestClient::new(RestClientConfig::default()).unwrap();
        let outcome = client.get("not a url").await;
        assert!(!outcome.success());
        assert_eq!(outcome.http_status(), StatusCode::BAD_REQUEST);
        assert!(outcome.response().is_none());
    }
}
