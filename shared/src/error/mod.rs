//! Failure classification shared by the storage and REST layers
//!
//! Both outcome flavors classify a failed call into one of a small, closed
//! set of [`FailureCategory`] values. The category decides the HTTP status an
//! outcome maps to when it crosses an HTTP-server boundary.
//!
//! | category | status |
//! |----------|--------|
//! | `ServiceUnavailable` | 503 |
//! | `BadRequest` | 400 |
//! | `ServerReported` | carried verbatim, 500 if none |
//! | `PartialFailure` | 500 |
//! | `Internal` | 500 |

mod category;
mod http;

pub use category::FailureCategory;
