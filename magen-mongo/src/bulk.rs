//! Ordered bulk operation builder

use crate::driver::BulkOp;
use mongodb::bson::Document;

/// Operations queued for one ordered bulk write
///
/// Created empty by `Dao::initialize_bulk_operation`, filled through the
/// DAO's `bulk_*` helpers and consumed by `Dao::execute_bulk_operation`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkOperation {
    operations: Vec<BulkOp>,
}

impl BulkOperation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, document: Document) -> &mut Self {
        self.operations.push(BulkOp::Insert(document));
        self
    }

    pub fn remove_one(&mut self, filter: Document) -> &mut Self {
        self.operations.push(BulkOp::RemoveOne(filter));
        self
    }

    pub fn update_one(&mut self, filter: Document, update: Document) -> &mut Self {
        self.operations.push(BulkOp::UpdateOne { filter, update });
        self
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn operations(&self) -> &[BulkOp] {
        &self.operations
    }

    pub fn into_operations(self) -> Vec<BulkOp> {
        self.operations
    }
}
