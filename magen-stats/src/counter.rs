//! Counter metric
//!
//! A cumulative value that only goes up until it is reset. Counters usually
//! count requests served or responses sent by a service (`source`).

use crate::error::{StatsError, StatsResult};
use crate::flavor::CounterFlavor;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace reported in detailed views
pub const COUNTER_NAMESPACE: &str = "Metric.Counter";

/// Optional settings for a new counter
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CounterCreate {
    pub name: Option<String>,
    #[serde(default)]
    pub abs_value: u64,
    /// Expected update period in seconds, 0 when none
    #[serde(default)]
    pub period: u64,
    #[serde(default)]
    pub alerts: bool,
    pub flavor: Option<CounterFlavor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counter {
    uuid: Uuid,
    name: String,
    source: String,
    abs_value: u64,
    period: u64,
    alerts: bool,
    flavor: Option<CounterFlavor>,
}

impl Counter {
    /// Create a counter for `source`
    ///
    /// A name or a flavor is required. Flavored counters without a name are
    /// named `{source}.{flavor_name}.{title}`.
    pub fn new(source: impl Into<String>, create: CounterCreate) -> StatsResult<Self> {
        let source = source.into();
        let name = match (create.name, &create.flavor) {
            (Some(name), _) if !name.is_empty() => name,
            (_, Some(flavor)) => flavored_name(&source, flavor),
            _ => return Err(StatsError::MissingNameOrFlavor),
        };

        Ok(Self {
            uuid: Uuid::new_v4(),
            name,
            source,
            abs_value: create.abs_value,
            period: create.period,
            alerts: create.alerts,
            flavor: create.flavor,
        })
    }

    /// Unnamed counter for `flavor`, starting at 0
    pub fn from_flavor(source: impl Into<String>, flavor: CounterFlavor) -> Self {
        let source = source.into();
        Self {
            uuid: Uuid::new_v4(),
            name: flavored_name(&source, &flavor),
            source,
            abs_value: 0,
            period: 0,
            alerts: false,
            flavor: Some(flavor),
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn abs_value(&self) -> u64 {
        self.abs_value
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    pub fn alerts(&self) -> bool {
        self.alerts
    }

    pub fn flavor(&self) -> Option<&CounterFlavor> {
        self.flavor.as_ref()
    }

    /// Add `value`, or 1 when `value` is 0
    pub fn increment(&mut self, value: u64) {
        let step = if value == 0 { 1 } else { value };
        self.abs_value = self.abs_value.saturating_add(step);
    }

    pub fn reset(&mut self) {
        self.abs_value = 0;
    }

    pub(crate) fn belongs_to(&self, source: &str) -> bool {
        self.source.eq_ignore_ascii_case(source)
    }

    /// Short view used in listings
    pub fn summary(&self) -> CounterSummary {
        CounterSummary {
            uuid: self.uuid,
            name: self.name.clone(),
            abs_value: self.abs_value,
            flavor: self.flavor.as_ref().map(|f| f.flavor_name().to_string()),
            flavor_opt: self.flavor.as_ref().map(CounterFlavor::title),
        }
    }

    /// Full view returned for a single counter
    pub fn detail(&self) -> CounterDetail {
        CounterDetail {
            uuid: self.uuid,
            name: self.name.clone(),
            source: self.source.clone(),
            abs_value: self.abs_value,
            period: self.period,
            alerts: self.alerts,
            namespace: COUNTER_NAMESPACE.to_string(),
            flavor: self.flavor.as_ref().map(|f| f.flavor_name().to_string()),
            flavor_opt: self.flavor.as_ref().map(CounterFlavor::title),
        }
    }
}

fn flavored_name(source: &str, flavor: &CounterFlavor) -> String {
    format!("{source}.{}.{}", flavor.flavor_name(), flavor.title())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterSummary {
    pub uuid: Uuid,
    pub name: String,
    pub abs_value: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flavor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flavor_opt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterDetail {
    pub uuid: Uuid,
    pub name: String,
    pub source: String,
    pub abs_value: u64,
    pub period: u64,
    pub alerts: bool,
    pub namespace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flavor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flavor_opt: Option<String>,
}
