use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tessera_kernel::Aid;
use tessera_kernel::agent::AgentFactory;
use tessera_kernel::endpoint::{DeliveryError, RemoteEndpoint, ServiceLocator};
use tessera_kernel::message::AclMessage;
use tessera_runtime::{AgentNode, ClusterTopology, InMemoryServiceLocator, RelayInfo};
use tracing::debug;

use crate::store::MockLocationStore;

/// Several nodes in one process sharing a location store and a service
/// locator.
///
/// Construction panics on an invalid topology; call it from a tokio test.
pub struct TestCluster {
    store: Arc<MockLocationStore>,
    locator: Arc<InMemoryServiceLocator>,
    nodes: Vec<AgentNode>,
}

impl TestCluster {
    /// A coordinator plus `members`, each node hosting every factory.
    pub fn start(coordinator: &str, members: &[&str], factories: &[Arc<dyn AgentFactory>]) -> Self {
        Self::build(coordinator, members, None, factories)
    }

    /// Like [`TestCluster::start`], with `relay` configured on every node.
    pub fn start_with_relay(
        coordinator: &str,
        members: &[&str],
        relay: RelayInfo,
        factories: &[Arc<dyn AgentFactory>],
    ) -> Self {
        Self::build(coordinator, members, Some(relay), factories)
    }

    /// One member node whose coordinator is never started.
    pub fn single(address: &str, factories: &[Arc<dyn AgentFactory>]) -> Self {
        let store = Arc::new(MockLocationStore::new());
        let locator = Arc::new(InMemoryServiceLocator::new());
        let topology = ClusterTopology::member(address, "coordinator.invalid")
            .unwrap_or_else(|report| panic!("invalid test topology: {report:?}"));
        let node = Self::node_for(topology, &store, &locator, factories);
        Self {
            store,
            locator,
            nodes: vec![node],
        }
    }

    fn build(
        coordinator: &str,
        members: &[&str],
        relay: Option<RelayInfo>,
        factories: &[Arc<dyn AgentFactory>],
    ) -> Self {
        let store = Arc::new(MockLocationStore::new());
        let locator = Arc::new(InMemoryServiceLocator::new());

        let mut topologies = vec![ClusterTopology::coordinator(coordinator, members.iter().copied())];
        topologies.extend(
            members
                .iter()
                .map(|member| ClusterTopology::member(member, coordinator)),
        );

        let nodes = topologies
            .into_iter()
            .map(|topology| {
                let mut topology =
                    topology.unwrap_or_else(|report| panic!("invalid test topology: {report:?}"));
                if let Some(relay) = &relay {
                    topology = topology.with_relay(relay.clone());
                }
                Self::node_for(topology, &store, &locator, factories)
            })
            .collect();

        Self {
            store,
            locator,
            nodes,
        }
    }

    fn node_for(
        topology: ClusterTopology,
        store: &Arc<MockLocationStore>,
        locator: &Arc<InMemoryServiceLocator>,
        factories: &[Arc<dyn AgentFactory>],
    ) -> AgentNode {
        let mut builder = AgentNode::builder(Arc::new(topology))
            .with_location_store(Arc::clone(store) as _)
            .with_service_locator(Arc::clone(locator) as _);
        for factory in factories {
            builder = builder.with_factory(Arc::clone(factory));
        }
        builder
            .build()
            .unwrap_or_else(|e| panic!("test node must be built inside a tokio runtime: {e}"))
    }

    /// The node at `address`.
    pub fn node(&self, address: &str) -> &AgentNode {
        self.nodes
            .iter()
            .find(|n| n.address() == address)
            .unwrap_or_else(|| panic!("no test node at {address}"))
    }

    pub fn nodes(&self) -> &[AgentNode] {
        &self.nodes
    }

    pub fn store(&self) -> &Arc<MockLocationStore> {
        &self.store
    }

    pub fn locator(&self) -> &Arc<InMemoryServiceLocator> {
        &self.locator
    }

    pub async fn shutdown(&self) {
        for node in &self.nodes {
            node.shutdown().await;
        }
    }
}

/// A remote endpoint that records deliveries instead of enqueuing them.
/// Stands in for a relay bridge or a node reached over a transport.
#[derive(Default)]
pub struct CapturingEndpoint {
    deliveries: Mutex<Vec<(Aid, Arc<AclMessage>)>>,
    failure: Mutex<Option<DeliveryError>>,
}

impl CapturingEndpoint {
    /// Creates an endpoint and publishes it under `address`. Keep the
    /// returned `Arc` alive for as long as the endpoint should resolve.
    pub fn publish(locator: &dyn ServiceLocator, address: &str) -> Arc<Self> {
        let endpoint = Arc::new(Self::default());
        let weak: Weak<dyn RemoteEndpoint> = Arc::downgrade(&endpoint) as Weak<dyn RemoteEndpoint>;
        locator.publish(address, weak);
        endpoint
    }

    /// Every later delivery fails with `error`.
    pub fn fail_with(&self, error: DeliveryError) {
        *self.failure.lock() = Some(error);
    }

    pub fn deliveries(&self) -> Vec<(Aid, Arc<AclMessage>)> {
        self.deliveries.lock().clone()
    }

    pub fn receivers(&self) -> Vec<Aid> {
        self.deliveries.lock().iter().map(|(aid, _)| aid.clone()).collect()
    }
}

#[async_trait]
impl RemoteEndpoint for CapturingEndpoint {
    async fn deliver(&self, receiver: &Aid, msg: Arc<AclMessage>) -> Result<(), DeliveryError> {
        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }
        debug!(receiver = %receiver, "Captured delivery");
        self.deliveries.lock().push((receiver.clone(), msg));
        Ok(())
    }
}

/// Polls `condition` until it holds or `timeout` elapses. Returns whether it
/// held.
pub async fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
