//! Driver boundary
//!
//! [`DocumentCollection`] is the seam between the DAO and a concrete
//! document store. Implementations map native driver results to the typed
//! acknowledgement structs below and native errors to [`StoreError`].

use crate::error::StoreError;
use async_trait::async_trait;
use mongodb::bson::{Bson, Document};

/// Result type for driver calls
pub type StoreResult<T> = Result<T, StoreError>;

/// Server error code reported for a bad value when nothing more specific applies
pub const BAD_VALUE_CODE: i32 = 2;

// ========== Acknowledgements ==========

#[derive(Debug, Clone, PartialEq)]
pub struct InsertOneAck {
    pub acknowledged: bool,
    pub inserted_id: Option<Bson>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertManyAck {
    pub acknowledged: bool,
    pub inserted_count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateAck {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_id: Option<Bson>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteAck {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

/// Totals of an executed bulk write
///
/// Also carried by [`StoreError::BulkWrite`] for the operations that
/// completed before the failing one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkWriteAck {
    pub inserted_count: u64,
    pub removed_count: u64,
    pub matched_count: u64,
    pub modified_count: u64,
}

impl BulkWriteAck {
    /// Documents inserted, modified or removed
    pub fn affected(&self) -> u64 {
        self.inserted_count + self.modified_count + self.removed_count
    }
}

// ========== Bulk operations ==========

/// One queued operation of an ordered bulk write
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOp {
    Insert(Document),
    RemoveOne(Document),
    UpdateOne { filter: Document, update: Document },
}

impl BulkOp {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Insert(_) => "insert",
            Self::RemoveOne(_) => "remove_one",
            Self::UpdateOne { .. } => "update_one",
        }
    }
}

/// A collection of documents in a document store
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    /// Collection name
    fn name(&self) -> &str;

    async fn insert_one(&self, document: Document) -> StoreResult<InsertOneAck>;

    async fn insert_many(&self, documents: Vec<Document>) -> StoreResult<InsertManyAck>;

    async fn update_one(&self, filter: Document, update: Document) -> StoreResult<UpdateAck>;

    async fn update_many(&self, filter: Document, update: Document) -> StoreResult<UpdateAck>;

    async fn delete_one(&self, filter: Document) -> StoreResult<DeleteAck>;

    async fn delete_many(&self, filter: Document) -> StoreResult<DeleteAck>;

    async fn find(
        &self,
        filter: Document,
        projection: Option<Document>,
    ) -> StoreResult<Vec<Document>>;

    async fn find_one(
        &self,
        filter: Document,
        projection: Option<Document>,
    ) -> StoreResult<Option<Document>>;

    /// Replace the first match, returning the document after the write
    ///
    /// With `upsert` the replacement is inserted when nothing matches.
    async fn find_one_and_replace(
        &self,
        filter: Document,
        replacement: Document,
        upsert: bool,
    ) -> StoreResult<Option<Document>>;

    async fn count_documents(&self, filter: Document) -> StoreResult<u64>;

    /// Execute an ordered batch
    ///
    /// An empty batch fails with [`StoreError::InvalidOperation`]. Execution
    /// stops at the first failing item, which is reported as
    /// [`StoreError::BulkWrite`] together with the totals reached so far.
    async fn bulk_write(&self, operations: Vec<BulkOp>) -> StoreResult<BulkWriteAck>;
}

/// Message used when a bulk write is submitted with nothing queued
pub const EMPTY_BULK_MESSAGE: &str = "No operations to execute";
