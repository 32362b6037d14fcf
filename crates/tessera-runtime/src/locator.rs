//! In-process service locator.

use dashmap::DashMap;
use std::sync::{Arc, Weak};
use tessera_kernel::endpoint::{RemoteEndpoint, ServiceLocator};
use tracing::debug;

/// Address → endpoint directory for nodes living in one process.
#[derive(Default)]
pub struct InMemoryServiceLocator {
    endpoints: DashMap<String, Weak<dyn RemoteEndpoint>>,
}

impl InMemoryServiceLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Addresses whose endpoint is still alive.
    pub fn addresses(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self
            .endpoints
            .iter()
            .filter(|e| e.value().strong_count() > 0)
            .map(|e| e.key().clone())
            .collect();
        addresses.sort();
        addresses
    }
}

impl ServiceLocator for InMemoryServiceLocator {
    fn publish(&self, address: &str, endpoint: Weak<dyn RemoteEndpoint>) {
        debug!(address, "Published node endpoint");
        self.endpoints.insert(address.to_string(), endpoint);
    }

    fn resolve(&self, address: &str) -> Option<Arc<dyn RemoteEndpoint>> {
        self.endpoints.get(address).and_then(|e| e.value().upgrade())
    }

    fn withdraw(&self, address: &str) {
        self.endpoints.remove(address);
    }
}

impl std::fmt::Debug for InMemoryServiceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryServiceLocator")
            .field("addresses", &self.addresses())
            .finish()
    }
}
