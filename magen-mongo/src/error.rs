//! Storage error kinds and translation
//!
//! Every driver failure is converted into a [`StoreError`] at the driver
//! boundary. DAO operations never propagate it: [`handle_store_error`] turns
//! it into a failed [`MongoReturn`] and logs it.

use crate::driver::BulkWriteAck;
use crate::outcome::MongoReturn;
use mongodb::error::{ErrorKind, WriteFailure};
use shared::FailureCategory;
use thiserror::Error;

/// Server error code for a cursor that no longer exists
pub const CURSOR_NOT_FOUND_CODE: i32 = 43;
/// Server error code for `maxTimeMS` expiry
pub const EXCEEDED_TIME_LIMIT_CODE: i32 = 50;
/// Server error code for a unique index violation
pub const DUPLICATE_KEY_CODE: i32 = 11000;

/// One failed item of a bulk write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkWriteFailure {
    /// Position of the failed operation in the submitted batch
    pub index: usize,
    pub code: i32,
    pub message: String,
}

impl std::fmt::Display for BulkWriteFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} (code {}): {}", self.index, self.code, self.message)
    }
}

/// Storage error kinds
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    /// The server rejected the operation and reported a code
    #[error("Operation failure (code {code}): {message}")]
    OperationFailure { code: i32, message: String },

    /// Some items of a bulk write failed
    #[error("Bulk write error: {} failed item(s)", write_errors.len())]
    BulkWrite {
        write_errors: Vec<BulkWriteFailure>,
        /// Totals of the operations applied before the failure
        completed: BulkWriteAck,
    },

    #[error("Network timeout: {0}")]
    NetworkTimeout(String),

    #[error("Execution timeout: {0}")]
    ExecutionTimeout(String),

    #[error("Cursor not found: {0}")]
    CursorNotFound(String),

    #[error("Connection error: {0}")]
    Connection(String),

    /// Filter, update or document could not be used as given
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Operation not valid in the current state (e.g. an empty bulk)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Unclassified driver failure
    #[error("Driver error: {}", .0.as_deref().unwrap_or_default())]
    Driver(Option<String>),
}

impl StoreError {
    /// Failure category of this error
    pub fn category(&self) -> FailureCategory {
        match self {
            Self::NetworkTimeout(_) | Self::ExecutionTimeout(_) | Self::Connection(_) => {
                FailureCategory::ServiceUnavailable
            }
            Self::MalformedRequest(_) => FailureCategory::BadRequest,
            Self::OperationFailure { .. } | Self::CursorNotFound(_) => {
                FailureCategory::ServerReported
            }
            Self::BulkWrite { .. } => FailureCategory::PartialFailure,
            Self::InvalidOperation(_) | Self::Driver(_) => FailureCategory::Internal,
        }
    }

    /// Driver error code, when the server reported one
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::OperationFailure { code, .. } => Some(*code),
            Self::CursorNotFound(_) => Some(CURSOR_NOT_FOUND_CODE),
            Self::ExecutionTimeout(_) => Some(EXCEEDED_TIME_LIMIT_CODE),
            _ => None,
        }
    }

    /// Message placed on the outcome
    ///
    /// Empty when the driver supplied none.
    pub fn outcome_message(&self) -> String {
        match self {
            Self::OperationFailure { message, .. } => message.clone(),
            Self::BulkWrite { write_errors, .. } => {
                let items: Vec<String> = write_errors.iter().map(|e| e.to_string()).collect();
                format!("BulkWriteError: {}", items.join("; "))
            }
            Self::NetworkTimeout(message)
            | Self::ExecutionTimeout(message)
            | Self::CursorNotFound(message)
            | Self::Connection(message)
            | Self::MalformedRequest(message)
            | Self::InvalidOperation(message) => message.clone(),
            Self::Driver(message) => message.clone().unwrap_or_default(),
        }
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        match err.kind.as_ref() {
            ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => {
                StoreError::NetworkTimeout(io.to_string())
            }
            ErrorKind::Io(io) => StoreError::Connection(io.to_string()),
            ErrorKind::ConnectionPoolCleared { message, .. }
            | ErrorKind::DnsResolve { message, .. }
            | ErrorKind::ServerSelection { message, .. } => {
                StoreError::Connection(message.clone())
            }
            ErrorKind::Command(command) => match command.code {
                CURSOR_NOT_FOUND_CODE => StoreError::CursorNotFound(command.message.clone()),
                EXCEEDED_TIME_LIMIT_CODE => StoreError::ExecutionTimeout(command.message.clone()),
                code => StoreError::OperationFailure {
                    code,
                    message: command.message.clone(),
                },
            },
            ErrorKind::Write(WriteFailure::WriteError(write)) => StoreError::OperationFailure {
                code: write.code,
                message: write.message.clone(),
            },
            ErrorKind::Write(WriteFailure::WriteConcernError(concern)) => {
                StoreError::OperationFailure {
                    code: concern.code,
                    message: concern.message.clone(),
                }
            }
            ErrorKind::InsertMany(insert) => StoreError::BulkWrite {
                write_errors: insert
                    .write_errors
                    .iter()
                    .flatten()
                    .map(|e| BulkWriteFailure {
                        index: e.index,
                        code: e.code,
                        message: e.message.clone(),
                    })
                    .collect(),
                completed: BulkWriteAck::default(),
            },
            ErrorKind::InvalidArgument { message, .. } => {
                StoreError::MalformedRequest(message.clone())
            }
            ErrorKind::BsonSerialization(e) => StoreError::MalformedRequest(e.to_string()),
            _ => StoreError::Driver(Some(err.to_string())),
        }
    }
}

/// Translate a storage error into a failed outcome
///
/// Always logs at error level. The outcome carries the error, its code when
/// one exists and a message that is empty when the driver supplied none. A
/// bulk write failure also reports the counts reached before it failed.
pub fn handle_store_error(err: StoreError) -> MongoReturn {
    tracing::error!(
        category = %err.category(),
        code = ?err.code(),
        "Storage operation failed: {}",
        err
    );

    let mut outcome = MongoReturn::new().with_message(err.outcome_message());
    if let Some(code) = err.code() {
        outcome = outcome.with_code(code);
    }
    if let StoreError::BulkWrite { completed, .. } = &err {
        outcome = outcome
            .with_count(completed.affected())
            .with_matched_count(completed.matched_count);
    }
    outcome.with_error(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            StoreError::NetworkTimeout("t".into()).category(),
            FailureCategory::ServiceUnavailable
        );
        assert_eq!(
            StoreError::Connection("refused".into()).category(),
            FailureCategory::ServiceUnavailable
        );
        assert_eq!(
            StoreError::MalformedRequest("bad".into()).category(),
            FailureCategory::BadRequest
        );
        assert_eq!(
            StoreError::CursorNotFound("gone".into()).category(),
            FailureCategory::ServerReported
        );
        assert_eq!(
            StoreError::BulkWrite {
                write_errors: vec![],
                completed: BulkWriteAck::default(),
            }
            .category(),
            FailureCategory::PartialFailure
        );
        assert_eq!(StoreError::Driver(None).category(), FailureCategory::Internal);
    }

    #[test]
    fn test_operation_failure_carries_code() {
        let outcome = handle_store_error(StoreError::OperationFailure {
            code: DUPLICATE_KEY_CODE,
            message: "E11000 duplicate key error".into(),
        });
        assert!(!outcome.success());
        assert_eq!(outcome.code(), Some(11000));
        assert_eq!(outcome.message(), Some("E11000 duplicate key error"));
        assert_eq!(outcome.category(), Some(FailureCategory::ServerReported));
    }

    #[test]
    fn test_driver_error_without_message() {
        let outcome = handle_store_error(StoreError::Driver(None));
        assert!(!outcome.success());
        assert_eq!(outcome.message(), Some(""));
        assert_eq!(outcome.code(), None);
        assert!(matches!(outcome.error(), Some(StoreError::Driver(None))));
    }

    #[test]
    fn test_bulk_write_message_lists_items() {
        let outcome = handle_store_error(StoreError::BulkWrite {
            write_errors: vec![
                BulkWriteFailure {
                    index: 1,
                    code: DUPLICATE_KEY_CODE,
                    message: "dup".into(),
                },
                BulkWriteFailure {
                    index: 3,
                    code: 2,
                    message: "bad value".into(),
                },
            ],
            completed: BulkWriteAck {
                inserted_count: 1,
                matched_count: 2,
                modified_count: 1,
                ..Default::default()
            },
        });
        assert_eq!(outcome.count(), 2);
        assert_eq!(outcome.matched_count(), 2);
        let message = outcome.message().unwrap();
        assert!(message.starts_with("BulkWriteError"));
        assert!(message.contains("#1 (code 11000): dup"));
        assert!(message.contains("#3 (code 2): bad value"));
    }

    #[test]
    fn test_execution_timeout_code() {
        let outcome = handle_store_error(StoreError::ExecutionTimeout("slow".into()));
        assert_eq!(outcome.code(), Some(EXCEEDED_TIME_LIMIT_CODE));
        assert_eq!(outcome.category(), Some(FailureCategory::ServiceUnavailable));
    }

    #[test]
    fn test_io_errors_from_driver() {
        let timed_out = mongodb::error::Error::from(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "socket read timed out",
        ));
        assert!(matches!(
            StoreError::from(timed_out),
            StoreError::NetworkTimeout(_)
        ));

        let refused = mongodb::error::Error::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        assert!(matches!(StoreError::from(refused), StoreError::Connection(_)));
    }
}
