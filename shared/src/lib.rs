//! Shared types for the magen service libraries
//!
//! Common pieces used by the storage, REST and statistics crates:
//! failure categories, RFC 7807 problem bodies, JSON comparison helpers,
//! environment configuration and logger setup.

pub mod compare;
pub mod config;
pub mod error;
pub mod logger;
pub mod problem;

// Re-exports
pub use compare::Verdict;
pub use config::MagenConfig;
pub use error::FailureCategory;
pub use http;
pub use problem::ProblemDetails;
