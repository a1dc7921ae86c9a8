//! JSON comparison helpers
//!
//! Used by the REST check helpers and by tests to decide whether a JSON body
//! received from a service matches an expected one. Two strategies exist:
//!
//! - [`compare_json`]: order-insensitive deep comparison that masks fields
//!   whose values are generated by the server (`uuid`, `_id`, keys, past
//!   timestamps) and checks that `renewal`/`expiration` lie in the future.
//! - [`full_compare_except_keys`]: flattens both objects into dotted keys,
//!   drops ignored keys and compares what is left.

use chrono::{DateTime, NaiveDateTime, Utc};
use http::StatusCode;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

/// Keys ignored by [`full_compare_except_keys`] in addition to the caller's
pub const DEFAULT_IGNORED_KEYS: &[&str] = &[
    "creation_timestamp",
    "uuid",
    "renewal",
    "revision",
    "expiration",
];

/// Result of an application-level check on a response
///
/// Returned by comparators and response predicates: whether the check passed,
/// a message, and the status the overall call should report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub success: bool,
    pub message: String,
    pub status: StatusCode,
}

impl Verdict {
    /// Build a verdict from its parts
    pub fn new(success: bool, message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            success,
            message: message.into(),
            status,
        }
    }

    /// Passing verdict: `200 OK`
    pub fn ok() -> Self {
        Self::new(true, reason(StatusCode::OK), StatusCode::OK)
    }

    /// Failing verdict: `500 Internal Server Error`
    pub fn mismatch() -> Self {
        Self::new(
            false,
            reason(StatusCode::INTERNAL_SERVER_ERROR),
            StatusCode::INTERNAL_SERVER_ERROR,
        )
    }
}

fn reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or_default()
}

// ========== Masked deep comparison ==========

/// Normalized form of a JSON value
///
/// Objects become key-sorted pair lists, arrays are sorted, and dynamic
/// values are replaced with fixed markers.
#[derive(Debug, Clone, PartialEq)]
enum Ordered {
    Pairs(Vec<(String, Ordered)>),
    List(Vec<Ordered>),
    Scalar(Value),
}

impl Ordered {
    fn marker(text: &str) -> Self {
        Ordered::Scalar(Value::String(text.to_string()))
    }

    /// Stable text used only to sort siblings
    fn sort_key(&self) -> String {
        match self {
            Ordered::Scalar(v) => v.to_string(),
            Ordered::List(items) => {
                let inner: Vec<String> = items.iter().map(Ordered::sort_key).collect();
                format!("[{}]", inner.join(","))
            }
            Ordered::Pairs(pairs) => {
                let inner: Vec<String> = pairs
                    .iter()
                    .map(|(k, v)| format!("{k:?}:{}", v.sort_key()))
                    .collect();
                format!("{{{}}}", inner.join(","))
            }
        }
    }
}

/// Parse the timestamp formats produced by the services
///
/// Accepts `T` or space separators, with or without an offset. Values
/// without an offset are taken as UTC.
fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let normalized = text.trim().replacen(' ', "T", 1);
    if let Ok(ts) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn non_empty_str(value: &Value) -> bool {
    value.as_str().is_some_and(|s| !s.is_empty())
}

fn non_empty_array(value: &Value) -> bool {
    value.as_array().is_some_and(|a| !a.is_empty())
}

fn order_field(key: &str, value: &Value, now: DateTime<Utc>) -> Ordered {
    match key {
        "cookie" if non_empty_str(value) => Ordered::marker("valid cookie string len > 0"),
        "_id" => Ordered::marker("OID"),
        "policy_sessions" if value.as_array().is_some_and(|a| a.len() == 1) => {
            Ordered::marker("valid ps list len == 1")
        }
        // Only mask reference lists that actually hold references, so that
        // an empty list never matches a populated one.
        "PI_list" | "policy_instances" if non_empty_array(value) => {
            Ordered::marker("valid PI list")
        }
        "uuid" => Ordered::marker("UUID will match"),
        "resource_id" if value.is_string() => Ordered::marker("magen_resource UUID will match"),
        "policy_contract_uuid" if value.is_string() => Ordered::marker("contract UUID will match"),
        "policy_template_uuid" if value.is_string() => Ordered::marker("template UUID will match"),
        "pi_uuid" => Ordered::marker("PI_UUID will match"),
        "iv" if non_empty_str(value) => Ordered::marker("dynamic iv"),
        "key" if value.is_string() => Ordered::marker("dynamic iv"),
        "key_id" => Ordered::marker("dynamic key"),
        k if k.contains("timestamp") => match value.as_str().and_then(parse_timestamp) {
            Some(ts) if ts < now => Ordered::marker("valid timestamp"),
            _ => order_value(value, now),
        },
        _ => order_value(value, now),
    }
}

fn order_value(value: &Value, now: DateTime<Utc>) -> Ordered {
    match value {
        Value::Object(map) => {
            let mut pairs: Vec<(String, Ordered)> = map
                .iter()
                .map(|(k, v)| (k.clone(), order_field(k, v, now)))
                .collect();
            pairs.sort_by_cached_key(|(k, v)| (k.clone(), v.sort_key()));
            Ordered::Pairs(pairs)
        }
        Value::Array(items) => {
            let mut list: Vec<Ordered> = items.iter().map(|v| order_value(v, now)).collect();
            list.sort_by_cached_key(Ordered::sort_key);
            Ordered::List(list)
        }
        other => Ordered::Scalar(other.clone()),
    }
}

fn in_future(received: &Ordered, now: DateTime<Utc>) -> bool {
    match received {
        Ordered::Scalar(Value::String(s)) => parse_timestamp(s).is_some_and(|ts| ts > now),
        _ => false,
    }
}

fn deep_check(expected: &Ordered, received: &Ordered, now: DateTime<Utc>) -> bool {
    match (expected, received) {
        (Ordered::Pairs(e), Ordered::Pairs(r)) => {
            e.len() == r.len()
                && e.iter().zip(r).all(|((k1, v1), (k2, v2))| {
                    if k1 != k2 {
                        return false;
                    }
                    match k1.as_str() {
                        "renewal" | "expiration" => in_future(v2, now),
                        _ => deep_check(v1, v2, now),
                    }
                })
        }
        (Ordered::List(e), Ordered::List(r)) => {
            e.len() == r.len() && e.iter().zip(r).all(|(a, b)| deep_check(a, b, now))
        }
        (Ordered::Scalar(a), Ordered::Scalar(b)) => a == b,
        _ => false,
    }
}

/// Compare two JSON documents, masking server-generated values
///
/// Returns [`Verdict::ok`] when they match, [`Verdict::mismatch`] otherwise.
pub fn compare_json(expected: &Value, received: &Value) -> Verdict {
    let now = Utc::now();
    let expected_ordered = order_value(expected, now);
    let received_ordered = order_value(received, now);

    if deep_check(&expected_ordered, &received_ordered, now) {
        Verdict::ok()
    } else {
        tracing::debug!(
            expected = %expected_ordered.sort_key(),
            received = %received_ordered.sort_key(),
            "JSON comparison failed"
        );
        Verdict::mismatch()
    }
}

// ========== Flattened comparison ==========

fn flatten_into(
    prefix: &str,
    value: &Value,
    ignored: &HashSet<&str>,
    order: bool,
    out: &mut BTreeMap<String, Value>,
) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                if ignored.contains(k.as_str()) {
                    continue;
                }
                let key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{prefix}.{k}")
                };
                flatten_into(&key, v, ignored, order, out);
            }
        }
        Value::Array(items) => {
            let mut flattened: Vec<Value> = items
                .iter()
                .map(|item| match item {
                    Value::Object(_) => {
                        let mut inner = BTreeMap::new();
                        flatten_into("", item, ignored, order, &mut inner);
                        Value::Object(inner.into_iter().collect::<Map<String, Value>>())
                    }
                    other => other.clone(),
                })
                .collect();
            if !order {
                flattened.sort_by_cached_key(|v| v.to_string());
            }
            out.insert(prefix.to_string(), Value::Array(flattened));
        }
        other => {
            out.insert(prefix.to_string(), other.clone());
        }
    }
}

/// Flatten a JSON object into dotted keys, skipping `ignored` keys
///
/// Lists are kept as values; unless `order` is set their elements are sorted
/// so that list order does not matter.
pub fn flatten_except_keys(
    value: &Value,
    ignored: &[&str],
    order: bool,
) -> BTreeMap<String, Value> {
    let ignored: HashSet<&str> = ignored.iter().copied().collect();
    let mut out = BTreeMap::new();
    flatten_into("", value, &ignored, order, &mut out);
    out
}

/// Compare two objects after dropping ignored keys
///
/// `excluded_keys` is merged with [`DEFAULT_IGNORED_KEYS`].
pub fn full_compare_except_keys(
    expected: &Value,
    actual: &Value,
    excluded_keys: &[&str],
    order: bool,
) -> bool {
    let ignored: Vec<&str> = DEFAULT_IGNORED_KEYS
        .iter()
        .chain(excluded_keys)
        .copied()
        .collect();
    flatten_except_keys(expected, &ignored, order) == flatten_except_keys(actual, &ignored, order)
}

/// Same as [`full_compare_except_keys`] with the default ignored keys only
pub fn default_full_compare(expected: &Value, actual: &Value) -> bool {
    full_compare_except_keys(expected, actual, &[], false)
}
