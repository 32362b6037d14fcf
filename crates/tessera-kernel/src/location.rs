//! Running-agent records and the distributed location cache contract.

use crate::aid::{AgentClass, Aid};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a live agent runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningAgentRecord {
    pub aid: Aid,
    /// Address of the hosting node.
    pub location: String,
    pub agent_class: AgentClass,
    /// Unix milliseconds.
    pub started_at: u64,
}

impl RunningAgentRecord {
    pub fn new(aid: Aid, location: impl Into<String>) -> Self {
        let agent_class = aid.agent_class();
        Self {
            aid,
            location: location.into(),
            agent_class,
            started_at: now_epoch_ms(),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum LocationStoreError {
    #[error("Location store unavailable: {0}")]
    Unavailable(String),
}

/// Cluster-wide `Aid -> RunningAgentRecord` store.
///
/// Last write wins; no transactional guarantee is required.
#[async_trait]
pub trait LocationStore: Send + Sync {
    async fn put(&self, record: RunningAgentRecord) -> Result<(), LocationStoreError>;

    async fn get(&self, aid: &Aid) -> Result<Option<RunningAgentRecord>, LocationStoreError>;

    async fn remove(&self, aid: &Aid) -> Result<(), LocationStoreError>;
}

fn now_epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
