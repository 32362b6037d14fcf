//! In-process location store.
//!
//! Shared by every node of an in-process cluster; stands in for the
//! replicated cache of a real deployment.

use async_trait::async_trait;
use dashmap::DashMap;
use tessera_kernel::Aid;
use tessera_kernel::location::{LocationStore, LocationStoreError, RunningAgentRecord};

#[derive(Debug, Default)]
pub struct InMemoryLocationStore {
    records: DashMap<Aid, RunningAgentRecord>,
}

impl InMemoryLocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records hosted on `location`.
    pub fn records_on(&self, location: &str) -> Vec<RunningAgentRecord> {
        self.records
            .iter()
            .filter(|e| e.value().location == location)
            .map(|e| e.value().clone())
            .collect()
    }
}

#[async_trait]
impl LocationStore for InMemoryLocationStore {
    async fn put(&self, record: RunningAgentRecord) -> Result<(), LocationStoreError> {
        self.records.insert(record.aid.clone(), record);
        Ok(())
    }

    async fn get(&self, aid: &Aid) -> Result<Option<RunningAgentRecord>, LocationStoreError> {
        Ok(self.records.get(aid).map(|r| r.value().clone()))
    }

    async fn remove(&self, aid: &Aid) -> Result<(), LocationStoreError> {
        self.records.remove(aid);
        Ok(())
    }
}
