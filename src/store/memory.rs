use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::errors::StoreError;
use crate::pipeline::WorkRecord;

use super::RecordStore;

/// In-process store for runs that should leave no checkpoint behind.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, WorkRecord>>,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn load(&self, id: &str) -> Result<Option<WorkRecord>, StoreError> {
        Ok(self.records.lock().await.get(id).cloned())
    }

    async fn save(&self, record: &WorkRecord) -> Result<(), StoreError> {
        self.records
            .lock()
            .await
            .insert(record.id.clone(), record.clone());
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
