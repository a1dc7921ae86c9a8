//! Call-then-verify helpers
//!
//! Compound operations used mostly by service tests: perform a write, then
//! read the resource back (or inspect the write response) and compare the
//! JSON with an expected body. Each helper stops at the first failed call and
//! returns that call's outcome unchanged.

use crate::client::RestClient;
use crate::outcome::RestReturn;
use http::StatusCode;
use reqwest::Url;
use serde_json::Value;
use shared::Verdict;
use shared::compare::compare_json;

/// Compares an expected body with a received one
pub type Comparator = dyn Fn(&Value, &Value) -> Verdict + Send + Sync;

/// `Location` header of a write outcome
pub fn location_header(outcome: &RestReturn) -> Option<&str> {
    outcome.location()
}

/// Resolve a `Location` value against the URL the write was sent to
fn resolve_location(base: &str, location: &str) -> Option<String> {
    Url::parse(base)
        .and_then(|b| b.join(location))
        .ok()
        .map(String::from)
}

/// Outcome of comparing `expected` with the JSON body of `received`
///
/// A missing body is a 500 from the client's point of view.
fn compare_outcome(received: RestReturn, expected: &Value, compare: Option<&Comparator>) -> RestReturn {
    let Some(actual) = received.json_body().cloned() else {
        tracing::warn!("Expected a JSON body but the response had none");
        let outcome = RestReturn::failure(StatusCode::INTERNAL_SERVER_ERROR);
        return match received.response() {
            Some(response) => outcome.with_response(response.clone()),
            None => outcome,
        };
    };

    let verdict = match compare {
        Some(compare) => compare(expected, &actual),
        None => compare_json(expected, &actual),
    };
    if !verdict.success {
        tracing::debug!(expected = %expected, actual = %actual, "JSON comparison failed");
    }

    let outcome = RestReturn::new()
        .with_success(verdict.success)
        .with_message(verdict.message)
        .with_status(verdict.status)
        .with_json_body(actual);
    match received.response() {
        Some(response) => outcome.with_response(response.clone()),
        None => outcome,
    }
}

impl RestClient {
    /// POST, follow the `Location` header with a GET and compare its body
    pub async fn post_and_compare_get_resp(
        &self,
        url: &str,
        body: &Value,
        expected: &Value,
        compare: Option<&Comparator>,
    ) -> RestReturn {
        let posted = self.post(url, body).await;
        if !posted.success() {
            return posted;
        }

        let Some(location) = location_header(&posted).and_then(|l| resolve_location(url, l)) else {
            tracing::warn!(url = %url, "POST response has an unusable Location header");
            return RestReturn::failure(StatusCode::INTERNAL_SERVER_ERROR);
        };

        let fetched = self.get(&location).await;
        if !fetched.success() {
            return fetched;
        }
        compare_outcome(fetched, expected, compare)
    }

    /// POST and compare the body of the POST response
    pub async fn post_and_compare_resp(
        &self,
        url: &str,
        body: &Value,
        expected: &Value,
        compare: Option<&Comparator>,
    ) -> RestReturn {
        let posted = self.post(url, body).await;
        if !posted.success() {
            return posted;
        }
        compare_outcome(posted, expected, compare)
    }

    /// GET and compare the response body
    pub async fn get_and_compare_resp(
        &self,
        url: &str,
        expected: &Value,
        compare: Option<&Comparator>,
    ) -> RestReturn {
        let fetched = self.get(url).await;
        if !fetched.success() {
            return fetched;
        }
        compare_outcome(fetched, expected, compare)
    }

    /// PUT, GET the same URL and compare its body
    pub async fn put_and_compare_get_resp(
        &self,
        url: &str,
        body: &Value,
        expected: &Value,
        compare: Option<&Comparator>,
    ) -> RestReturn {
        let put = self.put(url, body).await;
        if !put.success() {
            return put;
        }
        let fetched = self.get(url).await;
        if !fetched.success() {
            return fetched;
        }
        compare_outcome(fetched, expected, compare)
    }

    /// PUT and compare the body of the PUT response
    pub async fn put_and_compare_resp(
        &self,
        url: &str,
        body: &Value,
        expected: &Value,
        compare: Option<&Comparator>,
    ) -> RestReturn {
        let put = self.put(url, body).await;
        if !put.success() {
            return put;
        }
        compare_outcome(put, expected, compare)
    }

    /// DELETE, then GET the same URL; succeeds only if the GET reports 404
    pub async fn delete_and_get_check(&self, url: &str) -> RestReturn {
        let deleted = self.delete(url).await;
        if !deleted.success() {
            return deleted;
        }

        let fetched = self.get(url).await;
        let status = if fetched.http_status() == StatusCode::NOT_FOUND {
            StatusCode::OK
        } else {
            tracing::warn!(url = %url, status = %fetched.http_status(), "Resource still present after DELETE");
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let outcome = RestReturn::failure(status)
            .with_success(status == StatusCode::OK)
            .with_json_body(fetched.json_body().cloned());
        match fetched.response() {
            Some(response) => outcome.with_response(response.clone()),
            None => outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_location() {
        assert_eq!(
            resolve_location("http://h:5000/users/", "/users/42/").as_deref(),
            Some("http://h:5000/users/42/")
        );
        assert_eq!(
            resolve_location("http://h:5000/users/", "http://other/users/42/").as_deref(),
            Some("http://other/users/42/")
        );
        assert_eq!(resolve_location("not a url", "/x"), None);
    }

    #[test]
    fn test_compare_outcome_without_body_is_500() {
        let received = RestReturn::new().with_success(true).with_status(StatusCode::OK);
        let outcome = compare_outcome(received, &json!({"a": 1}), None);
        assert!(!outcome.success());
        assert_eq!(outcome.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(outcome.message(), Some("Internal Server Error"));
    }

    #[test]
    fn test_compare_outcome_uses_custom_comparator() {
        let received = RestReturn::new()
            .with_success(true)
            .with_json_body(json!({"a": 1}));
        let never: &Comparator = &|_, _| Verdict::new(false, "nope", StatusCode::CONFLICT);
        let outcome = compare_outcome(received, &json!({"a": 1}), Some(never));
        assert!(!outcome.success());
        assert_eq!(outcome.http_status(), StatusCode::CONFLICT);
        assert_eq!(outcome.message(), Some("nope"));
    }
}
