//! 消息路由
//! Message router
//!
//! Resolves each receiver of a message and hands it either to a local
//! mailbox or to the owning node's [`RemoteEndpoint`]. Fire-and-forget: no
//! acknowledgment, no retry. Receivers are routed concurrently and a failure
//! for one never affects the others.

use crate::registry::{AgentLocation, AgentRegistry, RegistryError};
use crate::topology::{ClusterTopology, RelayInfo};
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use tessera_kernel::Aid;
use tessera_kernel::endpoint::{DeliveryError, PostReport, RemoteEndpoint, ServiceLocator};
use tessera_kernel::message::AclMessage;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Late-bound handle from agent contexts to their node's router.
pub(crate) type RouterLink = Arc<OnceLock<Weak<MessageRouter>>>;

// ============================================================================
// 指标
// ============================================================================

/// Point-in-time router metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterMetricsSnapshot {
    /// Messages handed to `post`.
    pub posted: u64,
    /// Receivers enqueued on this node.
    pub delivered_local: u64,
    /// Receivers handed to another node or the relay.
    pub forwarded: u64,
    /// Receivers that could not be handed off.
    pub failed: u64,
    /// Inbound deliveries accepted from other nodes.
    pub received_remote: u64,
}

// Lock-free atomic counters
#[derive(Debug, Default)]
pub struct RouterMetrics {
    posted: AtomicU64,
    delivered_local: AtomicU64,
    forwarded: AtomicU64,
    failed: AtomicU64,
    received_remote: AtomicU64,
}

impl RouterMetrics {
    pub fn snapshot(&self) -> RouterMetricsSnapshot {
        RouterMetricsSnapshot {
            posted: self.posted.load(Ordering::Relaxed),
            delivered_local: self.delivered_local.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            received_remote: self.received_remote.load(Ordering::Relaxed),
        }
    }

    fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

// ============================================================================
// 路由器
// ============================================================================

enum Hop {
    Local,
    Forwarded,
}

pub struct MessageRouter {
    registry: Arc<AgentRegistry>,
    topology: Arc<ClusterTopology>,
    locator: Arc<dyn ServiceLocator>,
    metrics: RouterMetrics,
}

impl MessageRouter {
    /// Binds the router to `registry` (so agent contexts can post) and
    /// publishes it under the node's address.
    pub fn new(
        registry: Arc<AgentRegistry>,
        topology: Arc<ClusterTopology>,
        locator: Arc<dyn ServiceLocator>,
    ) -> Arc<Self> {
        let router = Arc::new(Self {
            registry,
            topology,
            locator,
            metrics: RouterMetrics::default(),
        });

        router.registry.bind_router(Arc::downgrade(&router));
        let endpoint: Weak<dyn RemoteEndpoint> = Arc::downgrade(&router) as Weak<dyn RemoteEndpoint>;
        router
            .locator
            .publish(router.topology.self_address(), endpoint);
        router
    }

    /// 发送消息
    /// Routes `msg` to every receiver and returns once each one was handed
    /// to a mailbox or to a remote endpoint.
    pub async fn post(&self, msg: AclMessage) -> PostReport {
        RouterMetrics::inc(&self.metrics.posted);
        let msg = Arc::new(msg);
        if msg.receivers.is_empty() {
            debug!(performative = %msg.performative, "Message has no receivers");
            return PostReport::default();
        }

        let outcomes = join_all(
            msg.receivers
                .iter()
                .map(|receiver| self.route(receiver, Arc::clone(&msg))),
        )
        .await;

        let mut report = PostReport::default();
        for (receiver, outcome) in msg.receivers.iter().zip(outcomes) {
            match outcome {
                Ok(Hop::Local) => {
                    RouterMetrics::inc(&self.metrics.delivered_local);
                    report.delivered.push(receiver.clone());
                }
                Ok(Hop::Forwarded) => {
                    RouterMetrics::inc(&self.metrics.forwarded);
                    report.forwarded.push(receiver.clone());
                }
                Err(e) => {
                    RouterMetrics::inc(&self.metrics.failed);
                    warn!(
                        receiver = %receiver,
                        performative = %msg.performative,
                        sender = ?msg.sender.as_ref().map(ToString::to_string),
                        error = %e,
                        "Delivery failed"
                    );
                    report.failed.push((receiver.clone(), e));
                }
            }
        }
        report
    }

    /// Posts on the worker pool without waiting for the hand-off.
    pub fn post_detached(self: &Arc<Self>, msg: AclMessage) -> JoinHandle<PostReport> {
        let router = Arc::clone(self);
        self.registry
            .pool()
            .spawn(async move { router.post(msg).await })
    }

    async fn route(&self, receiver: &Aid, msg: Arc<AclMessage>) -> Result<Hop, DeliveryError> {
        match self.registry.lookup(receiver).await {
            Ok(AgentLocation::Local(mailbox)) => {
                debug!(receiver = %receiver, "Routing locally");
                mailbox.enqueue(msg).map(|()| Hop::Local)
            }
            Ok(AgentLocation::Remote { node }) => {
                debug!(receiver = %receiver, node = %node, "Forwarding to owning node");
                self.forward(&node, receiver, msg).await.map(|()| Hop::Forwarded)
            }
            Err(RegistryError::NotFound(_)) => match self.relay_for(receiver) {
                Some(relay) => {
                    debug!(receiver = %receiver, relay = %relay.address, site = %relay.site, "Forwarding to relay");
                    self.forward(&relay.address, receiver, msg)
                        .await
                        .map(|()| Hop::Forwarded)
                }
                None => Err(DeliveryError::NotFound(receiver.clone())),
            },
            Err(e) => Err(DeliveryError::Lookup {
                aid: receiver.clone(),
                reason: e.to_string(),
            }),
        }
    }

    /// The relay, when `receiver` lives outside the cluster: its node is
    /// neither configured nor published in the service locator.
    fn relay_for(&self, receiver: &Aid) -> Option<&RelayInfo> {
        let node = receiver.node();
        self.topology
            .relay()
            .filter(|_| !self.topology.is_known_node(node))
            .filter(|_| self.locator.resolve(node).is_none())
    }

    async fn forward(
        &self,
        node: &str,
        receiver: &Aid,
        msg: Arc<AclMessage>,
    ) -> Result<(), DeliveryError> {
        let endpoint = self
            .locator
            .resolve(node)
            .ok_or_else(|| DeliveryError::Unreachable {
                node: node.to_string(),
            })?;
        endpoint.deliver(receiver, msg).await
    }

    pub fn metrics(&self) -> RouterMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn topology(&self) -> &Arc<ClusterTopology> {
        &self.topology
    }

    /// Removes this node from the service locator.
    pub fn withdraw(&self) {
        self.locator.withdraw(self.topology.self_address());
    }
}

#[async_trait]
impl RemoteEndpoint for MessageRouter {
    /// 入站投递
    /// Inbound delivery from another node. Enqueues locally only; a receiver
    /// that is not hosted here is `NotFound`.
    async fn deliver(&self, receiver: &Aid, msg: Arc<AclMessage>) -> Result<(), DeliveryError> {
        RouterMetrics::inc(&self.metrics.received_remote);
        match self.registry.local(receiver) {
            Some(mailbox) => mailbox.enqueue(msg),
            None => Err(DeliveryError::NotFound(receiver.clone())),
        }
    }
}

impl std::fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageRouter")
            .field("node", &self.topology.self_address())
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}
