//! Storage outcome object

use crate::error::StoreError;
use mongodb::bson::{Bson, Document};
use serde_json::{Value, json};
use shared::{FailureCategory, ProblemDetails};

/// Result of one DAO operation
///
/// Built inside the operation and handed back to the caller, who branches on
/// [`MongoReturn::success`]. A successful outcome never carries an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MongoReturn {
    success: bool,
    message: Option<String>,
    code: Option<i32>,
    count: u64,
    matched_count: u64,
    documents: Vec<Document>,
    error: Option<StoreError>,
}

impl MongoReturn {
    /// Failed outcome with no message, zero counts and no payload
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Accessors ==========

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Driver error code
    pub fn code(&self) -> Option<i32> {
        self.code
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn matched_count(&self) -> u64 {
        self.matched_count
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// First document of the payload
    pub fn document(&self) -> Option<&Document> {
        self.documents.first()
    }

    pub fn into_documents(self) -> Vec<Document> {
        self.documents
    }

    /// Error that caused the failure
    pub fn error(&self) -> Option<&StoreError> {
        self.error.as_ref()
    }

    /// Failure category of the underlying error
    pub fn category(&self) -> Option<FailureCategory> {
        self.error.as_ref().map(StoreError::category)
    }

    // ========== Builders ==========

    /// Set the success flag; marking success drops any error
    pub fn with_success(mut self, success: bool) -> Self {
        self.success = success;
        if success {
            self.error = None;
        }
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    pub fn with_matched_count(mut self, matched_count: u64) -> Self {
        self.matched_count = matched_count;
        self
    }

    pub fn with_documents(mut self, documents: Vec<Document>) -> Self {
        self.documents = documents;
        self
    }

    /// Attach the underlying error; the outcome becomes a failure
    pub fn with_error(mut self, error: StoreError) -> Self {
        self.success = false;
        self.error = Some(error);
        self
    }

    // ========== Projections ==========

    /// JSON projection: `{success, message, code, count, matched_count, json}`
    pub fn to_json(&self) -> Value {
        let documents: Vec<Value> = self
            .documents
            .iter()
            .map(|d| Bson::Document(d.clone()).into_relaxed_extjson())
            .collect();
        json!({
            "success": self.success,
            "message": self.message,
            "code": self.code,
            "count": self.count,
            "matched_count": self.matched_count,
            "json": documents,
        })
    }

    /// Problem details for a failed outcome
    ///
    /// `None` for a successful outcome.
    pub fn to_problem(&self) -> Option<ProblemDetails> {
        if self.success {
            return None;
        }
        let category = self.category().unwrap_or(FailureCategory::Internal);
        let mut problem =
            ProblemDetails::from_category(category).with_type(format!("urn:magen:storage:{category}"));
        if let Some(message) = self.message.as_deref().filter(|m| !m.is_empty()) {
            problem = problem.with_detail(message);
        }
        Some(problem)
    }
}
