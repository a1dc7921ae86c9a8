//! JSON REST client for the magen services
//!
//! Every verb returns a [`RestReturn`]. Transport failures and HTTP error
//! statuses are classified into [`RestError`] kinds and translated by
//! [`handle_rest_error`]; callers branch on [`RestReturn::success`].

pub mod checks;
pub mod client;
pub mod config;
pub mod error;
pub mod outcome;

// Re-exports
pub use checks::{Comparator, location_header};
pub use client::{CallOptions, ResponseCheck, RestClient, parse_url};
pub use config::{DEFAULT_TIMEOUT, RestClientConfig};
pub use error::{RestError, handle_rest_error};
pub use outcome::{HttpSnapshot, RestReturn};
