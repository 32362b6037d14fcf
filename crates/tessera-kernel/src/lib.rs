//! Tessera Kernel
//!
//! Value types and contracts shared by every Tessera node:
//!
//! - [`Aid`] / [`AgentClass`]: cluster-wide agent addressing
//! - [`message::AclMessage`]: FIPA ACL messages and performatives
//! - [`agent::Agent`] / [`agent::AgentFactory`]: hosted agent behaviour
//! - [`location::LocationStore`]: the distributed agent-location cache
//! - [`endpoint::RemoteEndpoint`] / [`endpoint::ServiceLocator`]: inter-node delivery
//! - [`environment::Environment`]: the reasoning-engine environment seam
//!
//! Concrete engines (mailboxes, registry, router, topology) live in
//! `tessera-runtime`.

// aid module
pub mod aid;
pub use aid::{AgentClass, Aid, AidError};

// agent module
pub mod agent;

// message module
pub mod message;

// delivery contracts
pub mod endpoint;

// location cache contract
pub mod location;

// BDI environment contract
pub mod environment;

// config module
#[cfg(feature = "config")]
pub mod config;
