//! Checkpoint persistence for work records.
//!
//! The store is last-writer-wins: only one pipeline instance works on a given
//! record at a time, so no locking or versioning is attempted.

mod file;
mod memory;

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::pipeline::WorkRecord;

pub use file::FileStore;
pub use memory::MemoryStore;

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn load(&self, id: &str) -> Result<Option<WorkRecord>, StoreError>;

    async fn save(&self, record: &WorkRecord) -> Result<(), StoreError>;
}
