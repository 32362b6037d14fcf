//! Agent 节点
//! Agent node
//!
//! Wires one node together: topology, worker pool, location store, service
//! locator, registry and router.
//!
//! # 示例
//! # Example
//!
//! ```rust,ignore
//! let node = AgentNode::builder(topology)
//!     .with_factory(Arc::new(FnAgentFactory::new(class.clone(), || Echo)))
//!     .build()?;
//!
//! let aid = node.registry().start(&class, "echo", AgentInitArgs::new()).await?;
//! node.router().post(AclMessage::new(Performative::Request).with_receiver(aid)).await;
//! node.shutdown().await;
//! ```

use crate::config::RuntimeConfig;
use crate::locator::InMemoryServiceLocator;
use crate::pool::{PoolError, WorkerPool};
use crate::registry::AgentRegistry;
use crate::router::MessageRouter;
use crate::store::InMemoryLocationStore;
use crate::topology::ClusterTopology;
use std::sync::Arc;
use tessera_kernel::Aid;
use tessera_kernel::agent::AgentFactory;
use tessera_kernel::endpoint::ServiceLocator;
use tessera_kernel::location::LocationStore;
use tracing::info;

pub struct AgentNode {
    topology: Arc<ClusterTopology>,
    pool: WorkerPool,
    registry: Arc<AgentRegistry>,
    router: Arc<MessageRouter>,
}

impl AgentNode {
    pub fn builder(topology: Arc<ClusterTopology>) -> AgentNodeBuilder {
        AgentNodeBuilder::new(topology)
    }

    pub fn address(&self) -> &str {
        self.topology.self_address()
    }

    pub fn topology(&self) -> &Arc<ClusterTopology> {
        &self.topology
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn router(&self) -> &Arc<MessageRouter> {
        &self.router
    }

    /// 关闭节点
    /// Stops every local agent and withdraws the node's endpoint.
    pub async fn shutdown(&self) -> Vec<Aid> {
        let stopped = self.registry.shutdown_all().await;
        self.router.withdraw();
        info!(address = %self.address(), stopped = stopped.len(), "Node shut down");
        stopped
    }
}

impl std::fmt::Debug for AgentNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentNode")
            .field("address", &self.address())
            .field("role", &self.topology.role())
            .field("pool", &self.pool)
            .finish()
    }
}

pub struct AgentNodeBuilder {
    topology: Arc<ClusterTopology>,
    runtime: RuntimeConfig,
    store: Option<Arc<dyn LocationStore>>,
    locator: Option<Arc<dyn ServiceLocator>>,
    factories: Vec<Arc<dyn AgentFactory>>,
}

impl AgentNodeBuilder {
    pub fn new(topology: Arc<ClusterTopology>) -> Self {
        Self {
            topology,
            runtime: RuntimeConfig::default(),
            store: None,
            locator: None,
            factories: Vec::new(),
        }
    }

    pub fn with_runtime_config(mut self, runtime: RuntimeConfig) -> Self {
        self.runtime = runtime;
        self
    }

    /// Shared cluster-wide store. Defaults to a store private to this node.
    pub fn with_location_store(mut self, store: Arc<dyn LocationStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Shared directory of node endpoints. Defaults to one private to this
    /// node.
    pub fn with_service_locator(mut self, locator: Arc<dyn ServiceLocator>) -> Self {
        self.locator = Some(locator);
        self
    }

    pub fn with_factory(mut self, factory: Arc<dyn AgentFactory>) -> Self {
        self.factories.push(factory);
        self
    }

    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Result<AgentNode, PoolError> {
        let pool = WorkerPool::new(&self.runtime)?;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryLocationStore::new()) as Arc<dyn LocationStore>);
        let locator = self
            .locator
            .unwrap_or_else(|| Arc::new(InMemoryServiceLocator::new()) as Arc<dyn ServiceLocator>);

        let registry = Arc::new(AgentRegistry::new(
            self.topology.self_address(),
            pool.clone(),
            store,
        ));
        for factory in self.factories {
            registry.register_factory(factory);
        }
        let router = MessageRouter::new(Arc::clone(&registry), Arc::clone(&self.topology), locator);

        info!(
            address = %self.topology.self_address(),
            role = %self.topology.role(),
            max_concurrent_handlers = pool.limit(),
            "Node started"
        );
        Ok(AgentNode {
            topology: self.topology,
            pool,
            registry,
            router,
        })
    }
}
