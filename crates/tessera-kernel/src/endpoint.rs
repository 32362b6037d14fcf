//! Delivery contracts between nodes.
//!
//! Each node's router is a [`RemoteEndpoint`]; nodes find each other through
//! an injected [`ServiceLocator`] instead of looking remote objects up by
//! name string.

use crate::aid::Aid;
use crate::message::AclMessage;
use async_trait::async_trait;
use std::sync::{Arc, Weak};
use thiserror::Error;

/// Per-receiver delivery failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DeliveryError {
    /// No live agent with this identifier.
    #[error("Agent not found: {0}")]
    NotFound(Aid),

    /// The agent was stopped; its mailbox no longer accepts messages.
    #[error("Agent terminated: {0}")]
    Terminated(Aid),

    /// No endpoint is published for the target node.
    #[error("Node unreachable: {node}")]
    Unreachable { node: String },

    /// The remote hop itself failed.
    #[error("Transport to {node} failed: {reason}")]
    Transport { node: String, reason: String },

    /// The location lookup failed for a reason other than a missing agent.
    #[error("Lookup of {aid} failed: {reason}")]
    Lookup { aid: Aid, reason: String },

    /// The router behind this context has been dropped.
    #[error("Router unavailable")]
    RouterUnavailable,
}

/// Outcome of posting one message.
///
/// Receivers are independent: a failure for one never prevents the
/// hand-off to the others.
#[derive(Debug, Default)]
pub struct PostReport {
    /// Enqueued into a mailbox on this node.
    pub delivered: Vec<Aid>,
    /// Handed to another node's (or the relay's) endpoint.
    pub forwarded: Vec<Aid>,
    pub failed: Vec<(Aid, DeliveryError)>,
}

impl PostReport {
    /// Every receiver fails with the same error.
    pub fn all_failed(receivers: &[Aid], error: DeliveryError) -> Self {
        Self {
            failed: receivers
                .iter()
                .map(|aid| (aid.clone(), error.clone()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of receivers handed to a mailbox or a transport.
    pub fn handed_off(&self) -> usize {
        self.delivered.len() + self.forwarded.len()
    }

    pub fn failure_for(&self, aid: &Aid) -> Option<&DeliveryError> {
        self.failed.iter().find(|(a, _)| a == aid).map(|(_, e)| e)
    }
}

/// A node-level delivery endpoint (a router endpoint or a relay bridge).
#[async_trait]
pub trait RemoteEndpoint: Send + Sync {
    /// Enqueues `msg` for `receiver`, which must be hosted behind this
    /// endpoint. Returns once the message is handed off.
    async fn deliver(&self, receiver: &Aid, msg: Arc<AclMessage>) -> Result<(), DeliveryError>;
}

/// Directory of node endpoints keyed by address.
///
/// Endpoints are held weakly so that publishing a router does not keep it
/// alive.
pub trait ServiceLocator: Send + Sync {
    fn publish(&self, address: &str, endpoint: Weak<dyn RemoteEndpoint>);

    fn resolve(&self, address: &str) -> Option<Arc<dyn RemoteEndpoint>>;

    fn withdraw(&self, address: &str);
}
