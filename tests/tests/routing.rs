//! Local delivery, inter-node forwarding and relay fallback.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tessera_kernel::environment::{Action, Environment, Percept};
use tessera_runtime::{
    AclMessage, AgentClass, AgentFactory, AgentInitArgs, Aid, DeliveryError, EnvironmentBridge,
    Performative, PostReport, RelayInfo,
};
use tessera_testing::{CapturingEndpoint, Probe, RecordingFactory, TestCluster, recording_class, wait_until};

const COORDINATOR: &str = "10.0.0.1";
const MEMBER: &str = "10.0.0.2";
const RELAY: &str = "relay.site-b";
const SETTLE: Duration = Duration::from_secs(5);

fn recording(probe: &Probe) -> Vec<Arc<dyn AgentFactory>> {
    vec![Arc::new(RecordingFactory::new(probe.clone()))]
}

fn relay() -> RelayInfo {
    RelayInfo {
        address: RELAY.to_string(),
        site: "site-b".to_string(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unknown_receiver_does_not_block_the_others() {
    let probe = Probe::new();
    let cluster = TestCluster::single(COORDINATOR, &recording(&probe));
    let node = cluster.node(COORDINATOR);
    let a = node
        .registry()
        .start(&recording_class(), "A", AgentInitArgs::new())
        .await
        .unwrap();
    let b = Aid::new(COORDINATOR, &recording_class(), "B");

    let report = node
        .router()
        .post(
            AclMessage::new(Performative::Inform)
                .with_receivers([a.clone(), b.clone()])
                .with_content("hello"),
        )
        .await;

    assert_eq!(report.delivered, vec![a.clone()]);
    assert_eq!(report.failure_for(&b), Some(&DeliveryError::NotFound(b.clone())));
    assert!(wait_until(SETTLE, || probe.contents_for("A") == vec!["hello"]).await);
    cluster.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_messages_cross_nodes() {
    let probe = Probe::new();
    let cluster = TestCluster::start(COORDINATOR, &[MEMBER, "10.0.0.3"], &recording(&probe));
    let on_member = cluster
        .node(MEMBER)
        .registry()
        .start(&recording_class(), "far", AgentInitArgs::new())
        .await
        .unwrap();
    let on_coordinator = cluster
        .node(COORDINATOR)
        .registry()
        .start(&recording_class(), "near", AgentInitArgs::new())
        .await
        .unwrap();

    // Member to member goes straight to the owning node.
    let report = cluster
        .node("10.0.0.3")
        .router()
        .post(
            AclMessage::new(Performative::Request)
                .with_receivers([on_member.clone(), on_coordinator.clone()])
                .with_content("ping"),
        )
        .await;
    assert!(report.is_complete());
    assert_eq!(report.forwarded.len(), 2);

    assert!(wait_until(SETTLE, || probe.handled() == 2).await);
    assert_eq!(probe.contents_for("far"), vec!["ping"]);
    assert_eq!(probe.contents_for("near"), vec!["ping"]);

    assert_eq!(cluster.node("10.0.0.3").router().metrics().forwarded, 2);
    assert_eq!(cluster.node(MEMBER).router().metrics().received_remote, 1);
    assert_eq!(cluster.node(COORDINATOR).router().metrics().received_remote, 1);
    cluster.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sender_order_survives_forwarding() {
    let probe = Probe::new();
    let cluster = TestCluster::start(COORDINATOR, &[MEMBER], &recording(&probe));
    let aid = cluster
        .node(MEMBER)
        .registry()
        .start(&recording_class(), "far", AgentInitArgs::new())
        .await
        .unwrap();

    let router = cluster.node(COORDINATOR).router();
    let expected: Vec<String> = (0..30).map(|i| format!("m{i}")).collect();
    for content in &expected {
        router
            .post(AclMessage::new(Performative::Inform).with_receiver(aid.clone()).with_content(content.as_str()))
            .await;
    }
    assert!(wait_until(SETTLE, || probe.handled() == expected.len()).await);
    assert_eq!(probe.contents(), expected);
    cluster.shutdown().await;
}

#[tokio::test]
async fn test_unreachable_owner_is_reported() {
    let probe = Probe::new();
    let cluster = TestCluster::start(COORDINATOR, &[MEMBER], &recording(&probe));
    let aid = cluster
        .node(MEMBER)
        .registry()
        .start(&recording_class(), "far", AgentInitArgs::new())
        .await
        .unwrap();

    cluster.node(MEMBER).router().withdraw();
    let report = cluster
        .node(COORDINATOR)
        .router()
        .post(AclMessage::new(Performative::Inform).with_receiver(aid.clone()))
        .await;
    assert_eq!(
        report.failure_for(&aid),
        Some(&DeliveryError::Unreachable {
            node: MEMBER.to_string()
        })
    );
    assert_eq!(cluster.node(COORDINATOR).router().metrics().failed, 1);
}

#[tokio::test]
async fn test_store_outage_surfaces_as_lookup_failure() {
    let probe = Probe::new();
    let cluster = TestCluster::start(COORDINATOR, &[MEMBER], &recording(&probe));
    let node = cluster.node(COORDINATOR);
    let local = node
        .registry()
        .start(&recording_class(), "local", AgentInitArgs::new())
        .await
        .unwrap();
    let remote = Aid::new(MEMBER, &recording_class(), "remote");

    cluster.store().set_failing(true);
    let report = node
        .router()
        .post(AclMessage::new(Performative::Inform).with_receivers([local.clone(), remote.clone()]))
        .await;
    cluster.store().set_failing(false);

    // Local receivers never touch the store.
    assert_eq!(report.delivered, vec![local]);
    assert!(matches!(report.failure_for(&remote), Some(DeliveryError::Lookup { .. })));
    cluster.shutdown().await;
}

#[tokio::test]
async fn test_receivers_outside_the_cluster_go_to_the_relay() {
    let probe = Probe::new();
    let cluster = TestCluster::start_with_relay(COORDINATOR, &[MEMBER], relay(), &recording(&probe));
    let bridge = CapturingEndpoint::publish(&**cluster.locator(), RELAY);

    let outside = Aid::new("172.16.4.2", &AgentClass::new("bdi", "Miner"), "m1");
    let inside = Aid::new(MEMBER, &recording_class(), "absent");

    let report = cluster
        .node(COORDINATOR)
        .router()
        .post(
            AclMessage::new(Performative::Propose)
                .with_receivers([outside.clone(), inside.clone()])
                .with_content("trade"),
        )
        .await;

    assert_eq!(report.forwarded, vec![outside.clone()]);
    assert_eq!(report.failure_for(&inside), Some(&DeliveryError::NotFound(inside.clone())));
    let deliveries = bridge.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].0, outside);
    assert_eq!(deliveries[0].1.content.as_deref(), Some("trade"));
    cluster.shutdown().await;
}

async fn post_from_member(cluster: &TestCluster, to: &Aid) -> PostReport {
    cluster
        .node(MEMBER)
        .router()
        .post(AclMessage::new(Performative::Inform).with_receiver(to.clone()))
        .await
}

#[tokio::test]
async fn test_relay_failures_are_per_receiver() {
    let probe = Probe::new();
    let cluster = TestCluster::start_with_relay(COORDINATOR, &[MEMBER], relay(), &recording(&probe));
    let outside = Aid::new("172.16.4.2", &AgentClass::new("bdi", "Miner"), "m1");

    // Not yet published.
    let report = post_from_member(&cluster, &outside).await;
    assert_eq!(
        report.failure_for(&outside),
        Some(&DeliveryError::Unreachable {
            node: RELAY.to_string()
        })
    );

    let bridge = CapturingEndpoint::publish(&**cluster.locator(), RELAY);
    let refused = DeliveryError::Transport {
        node: RELAY.to_string(),
        reason: "site-b offline".to_string(),
    };
    bridge.fail_with(refused.clone());
    let report = post_from_member(&cluster, &outside).await;
    assert_eq!(report.failure_for(&outside), Some(&refused));
    cluster.shutdown().await;
}

#[tokio::test]
async fn test_stopped_agent_on_sibling_member_is_not_relayed() {
    let probe = Probe::new();
    let sibling = "10.0.0.3";
    let cluster =
        TestCluster::start_with_relay(COORDINATOR, &[MEMBER, sibling], relay(), &recording(&probe));
    let bridge = CapturingEndpoint::publish(&**cluster.locator(), RELAY);

    let registry = cluster.node(sibling).registry();
    let gone = registry
        .start(&recording_class(), "w", AgentInitArgs::new())
        .await
        .unwrap();
    registry.stop(&gone).await.unwrap();

    // The member's topology names only itself and the coordinator.
    let report = post_from_member(&cluster, &gone).await;
    assert_eq!(report.failure_for(&gone), Some(&DeliveryError::NotFound(gone.clone())));
    assert!(report.forwarded.is_empty());
    assert!(bridge.deliveries().is_empty());
    cluster.shutdown().await;
}

#[tokio::test]
async fn test_without_relay_outside_receivers_are_not_found() {
    let probe = Probe::new();
    let cluster = TestCluster::start(COORDINATOR, &[MEMBER], &recording(&probe));
    let outside = Aid::new("172.16.4.2", &AgentClass::new("bdi", "Miner"), "m1");

    let report = cluster
        .node(COORDINATOR)
        .router()
        .post(AclMessage::new(Performative::Inform).with_receiver(outside.clone()))
        .await;
    assert_eq!(report.failure_for(&outside), Some(&DeliveryError::NotFound(outside.clone())));
}

// ============================================================================
// Environment bridge
// ============================================================================

struct Quarry;

#[async_trait]
impl Environment for Quarry {
    async fn percepts(&self, _aid: &Aid) -> Vec<Percept> {
        vec![Percept("gold at 3,4".to_string())]
    }

    async fn schedule_action(&self, _aid: &Aid, _action: Action, _reply_with: &str) {}
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_environment_feedback_reaches_remote_agents() {
    let probe = Probe::new();
    let cluster = TestCluster::start(COORDINATOR, &[MEMBER], &recording(&probe));
    let miners = cluster
        .node(MEMBER)
        .registry()
        .start_many(&recording_class(), "Miner", 2, AgentInitArgs::new())
        .await
        .unwrap();

    let bridge = EnvironmentBridge::new(Arc::new(Quarry), Arc::clone(cluster.node(COORDINATOR).router()));
    assert_eq!(bridge.percepts(&miners[0]).await, vec![Percept("gold at 3,4".to_string())]);

    let report = bridge.action_executed(&miners[0], false, "dig-1").await;
    assert_eq!(report.forwarded, vec![miners[0].clone()]);

    let report = bridge.environment_changed(&miners).await;
    assert_eq!(report.handed_off(), 2);

    assert!(wait_until(SETTLE, || probe.handled() == 3).await);
    assert_eq!(probe.contents_for("Miner1").len(), 2);
    assert_eq!(probe.contents_for("Miner2").len(), 1);
    cluster.shutdown().await;
}
