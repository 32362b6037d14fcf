use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tessera_kernel::Aid;
use tessera_kernel::location::{LocationStore, LocationStoreError, RunningAgentRecord};
use tessera_runtime::InMemoryLocationStore;

/// A location store that counts calls and fails on demand.
#[derive(Debug, Default)]
pub struct MockLocationStore {
    inner: InMemoryLocationStore,
    failing: AtomicBool,
    puts: AtomicUsize,
    gets: AtomicUsize,
    removes: AtomicUsize,
}

impl MockLocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every call fails with [`LocationStoreError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn remove_count(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }

    /// The records currently stored.
    pub fn records(&self) -> &InMemoryLocationStore {
        &self.inner
    }

    fn check(&self) -> Result<(), LocationStoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LocationStoreError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LocationStore for MockLocationStore {
    async fn put(&self, record: RunningAgentRecord) -> Result<(), LocationStoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.put(record).await
    }

    async fn get(&self, aid: &Aid) -> Result<Option<RunningAgentRecord>, LocationStoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.get(aid).await
    }

    async fn remove(&self, aid: &Aid) -> Result<(), LocationStoreError> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.remove(aid).await
    }
}
