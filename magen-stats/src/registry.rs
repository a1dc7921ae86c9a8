//! Counter registry
//!
//! Holds every counter of the process, indexed by UUID and, for flavored
//! counters, by flavor. The registry is an explicit value: create one and
//! hand clones to whatever needs to count. Clones share the same counters.

use crate::counter::{Counter, CounterCreate, CounterDetail, CounterSummary};
use crate::error::StatsResult;
use crate::flavor::CounterFlavor;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Counters {
    by_uuid: HashMap<Uuid, Counter>,
    /// Latest counter created for each flavor
    by_flavor: HashMap<CounterFlavor, Uuid>,
}

impl Counters {
    fn insert(&mut self, counter: Counter) -> Uuid {
        let uuid = counter.uuid();
        if let Some(flavor) = counter.flavor() {
            self.by_flavor.insert(flavor.clone(), uuid);
        }
        self.by_uuid.insert(uuid, counter);
        uuid
    }

    fn flavored_mut(&mut self, flavor: &CounterFlavor) -> Option<&mut Counter> {
        let uuid = self.by_flavor.get(flavor)?;
        self.by_uuid.get_mut(uuid)
    }

    fn remove(&mut self, uuid: &Uuid) -> Option<Counter> {
        let counter = self.by_uuid.remove(uuid)?;
        if let Some(flavor) = counter.flavor()
            && self.by_flavor.get(flavor) == Some(uuid)
        {
            self.by_flavor.remove(flavor);
        }
        Some(counter)
    }

    /// Summaries of matching counters, ordered by name
    fn summaries(&self, keep: impl Fn(&Counter) -> bool) -> Vec<CounterSummary> {
        let mut list: Vec<CounterSummary> = self
            .by_uuid
            .values()
            .filter(|c| keep(*c))
            .map(Counter::summary)
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name).then(a.uuid.cmp(&b.uuid)));
        list
    }
}

#[derive(Debug, Clone, Default)]
pub struct MetricsRegistry {
    counters: Arc<RwLock<Counters>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.counters.read().by_uuid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ========== Create ==========

    /// Register a new counter and return its UUID
    pub fn create_counter(&self, source: &str, create: CounterCreate) -> StatsResult<Uuid> {
        let counter = Counter::new(source, create)?;
        tracing::debug!(source = %source, name = %counter.name(), "Counter created");
        Ok(self.counters.write().insert(counter))
    }

    /// Register a counter for `flavor`
    ///
    /// The flavor index then points at the new counter, even if another
    /// counter had the same flavor.
    pub fn create_flavored_counter(
        &self,
        source: &str,
        flavor: CounterFlavor,
        create: CounterCreate,
    ) -> StatsResult<Uuid> {
        self.create_counter(
            source,
            CounterCreate {
                flavor: Some(flavor),
                ..create
            },
        )
    }

    // ========== Update ==========

    /// Increment a counter by UUID; false if it does not exist
    pub fn update_counter(&self, uuid: &Uuid, value: u64) -> bool {
        match self.counters.write().by_uuid.get_mut(uuid) {
            Some(counter) => {
                counter.increment(value);
                true
            }
            None => false,
        }
    }

    pub fn reset_counter(&self, uuid: &Uuid) -> bool {
        match self.counters.write().by_uuid.get_mut(uuid) {
            Some(counter) => {
                counter.reset();
                true
            }
            None => false,
        }
    }

    /// Increment the counter for `flavor`, creating it for `source` first if
    /// needed. Returns the counter UUID.
    pub fn increment(&self, flavor: &CounterFlavor, source: &str, value: u64) -> Uuid {
        let mut counters = self.counters.write();
        if let Some(counter) = counters.flavored_mut(flavor) {
            counter.increment(value);
            return counter.uuid();
        }

        let mut counter = Counter::from_flavor(source, flavor.clone());
        counter.increment(value);
        tracing::debug!(source = %source, name = %counter.name(), "Counter created on first increment");
        counters.insert(counter)
    }

    /// Reset the counter for `flavor`; false if there is none
    pub fn reset_flavored_counter(&self, flavor: &CounterFlavor) -> bool {
        match self.counters.write().flavored_mut(flavor) {
            Some(counter) => {
                counter.reset();
                true
            }
            None => false,
        }
    }

    // ========== Delete ==========

    pub fn delete_counter(&self, uuid: &Uuid) -> bool {
        self.counters.write().remove(uuid).is_some()
    }

    pub fn delete_flavored_counter(&self, flavor: &CounterFlavor) -> bool {
        let mut counters = self.counters.write();
        match counters.by_flavor.get(flavor).copied() {
            Some(uuid) => counters.remove(&uuid).is_some(),
            None => false,
        }
    }

    /// Delete every counter, or only those of `source` (case-insensitive)
    pub fn delete_counters(&self, source: Option<&str>) {
        let mut counters = self.counters.write();
        match source {
            Some(source) => {
                let doomed: Vec<Uuid> = counters
                    .by_uuid
                    .values()
                    .filter(|c| c.belongs_to(source))
                    .map(Counter::uuid)
                    .collect();
                for uuid in &doomed {
                    counters.remove(uuid);
                }
                tracing::debug!(source = %source, count = doomed.len(), "Counters deleted");
            }
            None => {
                counters.by_uuid.clear();
                counters.by_flavor.clear();
            }
        }
    }

    // ========== Read ==========

    pub fn get_counter(&self, uuid: &Uuid) -> Option<CounterDetail> {
        self.counters.read().by_uuid.get(uuid).map(Counter::detail)
    }

    pub fn get_flavored_counter(&self, flavor: &CounterFlavor) -> Option<CounterDetail> {
        let counters = self.counters.read();
        let uuid = counters.by_flavor.get(flavor)?;
        counters.by_uuid.get(uuid).map(Counter::detail)
    }

    pub fn get_all_counters(&self) -> Vec<CounterSummary> {
        self.counters.read().summaries(|_| true)
    }

    pub fn get_counters_by_source(&self, source: &str) -> Vec<CounterSummary> {
        self.counters.read().summaries(|c| c.belongs_to(source))
    }

    /// Counters whose flavor type is `flavor_type` (e.g. `RestResponse`),
    /// optionally limited to one source
    pub fn get_flavored_counters(
        &self,
        flavor_type: &str,
        source: Option<&str>,
    ) -> Vec<CounterSummary> {
        self.counters.read().summaries(|c| {
            source.is_none_or(|s| c.belongs_to(s))
                && c
                    .flavor()
                    .is_some_and(|f| f.flavor_name().eq_ignore_ascii_case(flavor_type))
        })
    }
}
