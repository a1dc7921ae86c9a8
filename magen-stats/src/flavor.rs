//! Counter flavors
//!
//! A flavor ties a counter to a REST event: a request method or a response
//! status. Flavored counters are named automatically and can be looked up by
//! flavor instead of UUID.
//!
//! The string form is `Type.OPTION`, e.g. `RestRequest.GET` or
//! `RestResponse.NOT_FOUND`. Response options are the canonical reason phrase
//! in upper snake case; the numeric code is accepted as well.

use crate::error::{StatsError, StatsResult};
use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const REST_REQUEST: &str = "RestRequest";
const REST_RESPONSE: &str = "RestResponse";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CounterFlavor {
    /// One of GET, POST, PUT, DELETE
    RestRequest(Method),
    RestResponse(StatusCode),
}

impl CounterFlavor {
    /// Type name: `RestRequest` or `RestResponse`
    pub fn flavor_name(&self) -> &'static str {
        match self {
            Self::RestRequest(_) => REST_REQUEST,
            Self::RestResponse(_) => REST_RESPONSE,
        }
    }

    /// Human title: the method name or the status reason phrase
    pub fn title(&self) -> String {
        match self {
            Self::RestRequest(method) => method.as_str().to_string(),
            Self::RestResponse(status) => status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| status.as_str().to_string()),
        }
    }

    /// Option part of the string form
    pub fn option(&self) -> String {
        match self {
            Self::RestRequest(method) => method.as_str().to_string(),
            Self::RestResponse(status) => constant_name(*status),
        }
    }

    /// Parse a `(type, option)` pair, case-insensitively
    pub fn parse(flavor_type: &str, flavor_opt: &str) -> StatsResult<Self> {
        let unknown = || StatsError::UnknownFlavor {
            flavor_type: flavor_type.to_string(),
            flavor_opt: flavor_opt.to_string(),
        };

        if flavor_type.eq_ignore_ascii_case(REST_REQUEST) {
            let method = match flavor_opt.to_ascii_uppercase().as_str() {
                "GET" => Method::GET,
                "POST" => Method::POST,
                "PUT" => Method::PUT,
                "DELETE" => Method::DELETE,
                _ => return Err(unknown()),
            };
            Ok(Self::RestRequest(method))
        } else if flavor_type.eq_ignore_ascii_case(REST_RESPONSE) {
            status_from_option(flavor_opt)
                .map(Self::RestResponse)
                .ok_or_else(unknown)
        } else {
            Err(unknown())
        }
    }
}

/// `Not Found` -> `NOT_FOUND`
fn constant_name(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => reason
            .to_ascii_uppercase()
            .replace([' ', '-'], "_")
            .replace('\'', ""),
        None => status.as_str().to_string(),
    }
}

fn status_from_option(option: &str) -> Option<StatusCode> {
    if let Ok(code) = option.parse::<u16>() {
        return StatusCode::from_u16(code).ok();
    }
    let wanted = option.to_ascii_uppercase();
    (100..600)
        .filter_map(|code| StatusCode::from_u16(code).ok())
        .filter(|status| status.canonical_reason().is_some())
        .find(|status| constant_name(*status) == wanted)
}

impl fmt::Display for CounterFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.flavor_name(), self.option())
    }
}

impl FromStr for CounterFlavor {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (flavor_type, flavor_opt) = s
            .split_once('.')
            .ok_or_else(|| StatsError::InvalidFlavor(s.to_string()))?;
        Self::parse(flavor_type, flavor_opt)
    }
}

impl TryFrom<String> for CounterFlavor {
    type Error = StatsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CounterFlavor> for String {
    fn from(flavor: CounterFlavor) -> Self {
        flavor.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request() {
        assert_eq!(
            CounterFlavor::parse("restrequest", "get").unwrap(),
            CounterFlavor::RestRequest(Method::GET)
        );
        assert!(matches!(
            CounterFlavor::parse("RestRequest", "PATCH"),
            Err(StatsError::UnknownFlavor { .. })
        ));
    }

    #[test]
    fn test_parse_response() {
        assert_eq!(
            CounterFlavor::parse("RestResponse", "NOT_FOUND").unwrap(),
            CounterFlavor::RestResponse(StatusCode::NOT_FOUND)
        );
        assert_eq!(
            CounterFlavor::parse("RestResponse", "non_authoritative_information").unwrap(),
            CounterFlavor::RestResponse(StatusCode::NON_AUTHORITATIVE_INFORMATION)
        );
        assert_eq!(
            CounterFlavor::parse("RestResponse", "503").unwrap(),
            CounterFlavor::RestResponse(StatusCode::SERVICE_UNAVAILABLE)
        );
        assert!(CounterFlavor::parse("RestResponse", "NOPE").is_err());
        assert!(CounterFlavor::parse("Gauge", "OK").is_err());
    }

    #[test]
    fn test_from_str_and_display() {
        let flavor: CounterFlavor = "RestResponse.MULTI_STATUS".parse().unwrap();
        assert_eq!(flavor, CounterFlavor::RestResponse(StatusCode::MULTI_STATUS));
        assert_eq!(flavor.to_string(), "RestResponse.MULTI_STATUS");
        assert!(matches!(
            "RestRequest".parse::<CounterFlavor>(),
            Err(StatsError::InvalidFlavor(_))
        ));
    }

    #[test]
    fn test_names_and_titles() {
        let flavor = CounterFlavor::RestResponse(StatusCode::NOT_FOUND);
        assert_eq!(flavor.flavor_name(), "RestResponse");
        assert_eq!(flavor.title(), "Not Found");

        let flavor = CounterFlavor::RestRequest(Method::DELETE);
        assert_eq!(flavor.flavor_name(), "RestRequest");
        assert_eq!(flavor.title(), "DELETE");
    }
}
