// =============================================================================
// Tessera Runtime - Agent Hosting and Message Routing
// =============================================================================
//
// Concrete engines behind the kernel contracts:
// - Mailbox: per-agent FIFO with at most one handler in flight
// - WorkerPool: shared, bounded execution for every agent of a node
// - AgentRegistry: naming, lifecycle and location publishing
// - MessageRouter: local enqueue, inter-node forwarding, relay
// - ClusterTopology: validated, once-per-process cluster membership
// - AgentNode: wires the above for one node
//
// =============================================================================

pub mod config;
pub mod environment;
pub mod locator;
pub mod mailbox;
pub mod node;
pub mod pool;
pub mod registry;
pub mod router;
pub mod store;
pub mod topology;

pub use config::RuntimeConfig;
pub use environment::EnvironmentBridge;
pub use locator::InMemoryServiceLocator;
pub use mailbox::{Mailbox, MailboxStats};
pub use node::{AgentNode, AgentNodeBuilder};
pub use pool::{PoolError, WorkerPool};
pub use registry::{
    AgentLocation, AgentRegistry, RegistryError, RegistryResult, RegistryStats, instance_names,
};
pub use router::{MessageRouter, RouterMetrics, RouterMetricsSnapshot};
pub use store::InMemoryLocationStore;
pub use topology::{
    ClusterTopology, RelayInfo, Role, TopologyError, TopologyLoader, TopologyResult,
    TransportEndpoint,
};

// Kernel types every runtime user needs
pub use tessera_kernel::agent::{
    Agent, AgentContext, AgentError, AgentFactory, AgentInitArgs, AgentResult, FnAgentFactory,
    Wait,
};
pub use tessera_kernel::endpoint::{DeliveryError, PostReport};
pub use tessera_kernel::message::{AclMessage, Performative};
pub use tessera_kernel::{AgentClass, Aid};
