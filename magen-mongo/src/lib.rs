//! Document-store data access for the magen services
//!
//! Every DAO call returns a [`MongoReturn`] instead of an error. Driver
//! failures are classified into [`StoreError`] kinds at the driver boundary
//! and turned into failed outcomes by [`handle_store_error`].
//!
//! # Example
//!
//! ```ignore
//! let core = MongoCore::connect(&MagenConfig::from_env()).await?;
//! let users = core.dao("users");
//! let outcome = users.find_one_filter(doc! { "uuid": "u-1" }, None).await;
//! if outcome.success() { /* ... */ }
//! ```

pub mod bulk;
pub mod dao;
pub mod driver;
pub mod error;
pub mod memory;
pub mod mongo;
pub mod outcome;

// Re-exports
pub use bulk::BulkOperation;
pub use dao::Dao;
pub use driver::{
    BulkOp, BulkWriteAck, DeleteAck, DocumentCollection, InsertManyAck, InsertOneAck,
    StoreResult, UpdateAck,
};
pub use error::{BulkWriteFailure, StoreError, handle_store_error};
pub use memory::InMemoryCollection;
pub use mongo::{MongoCollection, MongoCore};
pub use mongodb::bson;
pub use outcome::MongoReturn;
