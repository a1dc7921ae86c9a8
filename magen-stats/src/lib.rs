//! In-memory counter metrics for magen services
//!
//! Services count REST requests and responses (or anything else with a
//! name) through a shared [`MetricsRegistry`].

pub mod counter;
pub mod error;
pub mod flavor;
pub mod registry;

// Re-exports
pub use counter::{COUNTER_NAMESPACE, Counter, CounterCreate, CounterDetail, CounterSummary};
pub use error::{StatsError, StatsResult};
pub use flavor::CounterFlavor;
pub use registry::MetricsRegistry;
