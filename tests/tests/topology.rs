//! Nodes built from cluster configuration files.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tessera_runtime::{
    AclMessage, AgentInitArgs, AgentNode, ClusterTopology, Performative, Role, RuntimeConfig,
    TopologyError, TopologyLoader,
};
use tessera_testing::{Probe, RecordingFactory, recording_class, wait_until};

fn config_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    write!(file, "{content}").unwrap();
    file
}

const COORDINATOR_TOML: &str = r#"
[server]
mode = "coordinator"
address = "10.1.0.1"

[[members]]
address = "10.1.0.2"

[[members]]
address = "10.1.0.3"

[transport]
port = 5000

[runtime]
max_concurrent_handlers = 2
"#;

const MEMBER_JSON: &str = r#"{
  "server": { "mode": "slave", "address": "10.1.0.2", "master": "10.1.0.1" },
  "relay": { "address": "gw.example", "site": "north" }
}"#;

#[test]
fn test_toml_coordinator_file() {
    let file = config_file(".toml", COORDINATOR_TOML);
    let topology = ClusterTopology::from_file(file.path()).unwrap();

    assert_eq!(topology.role(), Role::Coordinator);
    assert_eq!(topology.member_addresses(), ["10.1.0.2", "10.1.0.3"]);
    assert_eq!(topology.transport_port(), 5000);

    let names: Vec<String> = topology
        .transport_endpoints()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["C_10_1_0_1", "C_10_1_0_2", "C_10_1_0_3"]);

    let runtime = RuntimeConfig::from_file(file.path()).unwrap();
    assert_eq!(runtime.max_concurrent_handlers, 2);
}

#[test]
fn test_json_member_file_with_relay() {
    let file = config_file(".json", MEMBER_JSON);
    let topology = ClusterTopology::from_file(file.path()).unwrap();

    assert_eq!(topology.role(), Role::Member);
    assert_eq!(topology.coordinator_address(), Some("10.1.0.1"));
    assert_eq!(topology.relay().map(|r| r.site.as_str()), Some("north"));
    assert!(!topology.is_known_node("gw.example"));

    // Runtime section absent: defaults apply.
    let runtime = RuntimeConfig::from_file(file.path()).unwrap();
    assert_eq!(runtime, RuntimeConfig::default());
}

#[test]
fn test_invalid_file_is_fatal() {
    let file = config_file(".yaml", "server:\n  mode: member\n  address: 10.1.0.2\n");
    let loader = TopologyLoader::new();

    let report = loader.load(file.path()).unwrap_err();
    assert_eq!(report.current_context(), &TopologyError::MissingCoordinator);
    assert!(!loader.is_loaded());

    let unknown = config_file(".conf", "whatever");
    assert!(ClusterTopology::from_file(unknown.path()).is_err());
}

#[test]
fn test_loader_keeps_the_first_topology() {
    let coordinator = config_file(".toml", COORDINATOR_TOML);
    let member = config_file(".json", MEMBER_JSON);
    let loader = TopologyLoader::new();

    let first = loader.load(coordinator.path()).unwrap();
    let second = loader.load(member.path()).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.role(), Role::Coordinator);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_node_from_file_bounds_concurrent_handlers() {
    let file = config_file(".toml", COORDINATOR_TOML);
    let topology = Arc::new(ClusterTopology::from_file(file.path()).unwrap());
    let runtime = RuntimeConfig::from_file(file.path()).unwrap();

    let probe = Probe::new();
    let node = AgentNode::builder(topology)
        .with_runtime_config(runtime)
        .with_factory(Arc::new(
            RecordingFactory::new(probe.clone()).with_delay(Duration::from_millis(20)),
        ))
        .build()
        .unwrap();
    assert_eq!(node.pool().limit(), 2);

    let aids = node
        .registry()
        .start_many(&recording_class(), "Busy", 8, AgentInitArgs::new())
        .await
        .unwrap();
    for round in 0..3 {
        node.router()
            .post(
                AclMessage::new(Performative::Inform)
                    .with_receivers(aids.iter().cloned())
                    .with_content(format!("r{round}")),
            )
            .await;
    }

    assert!(wait_until(Duration::from_secs(5), || probe.handled() == 24).await);
    assert!(probe.max_in_flight() <= 2);
    for aid in &aids {
        assert_eq!(probe.contents_for(aid.name()), vec!["r0", "r1", "r2"]);
    }
    node.shutdown().await;
}
