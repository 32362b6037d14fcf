//! 集群拓扑
//! Cluster topology
//!
//! Built once per process from a validated configuration document and then
//! passed by reference to whatever needs it. There is no dynamic discovery:
//! the document is the whole membership.
//!
//! # 示例
//! # Example
//!
//! ```rust,ignore
//! static TOPOLOGY: TopologyLoader = TopologyLoader::new();
//!
//! let topology = TOPOLOGY.load("cluster.yaml")?;
//! for endpoint in topology.transport_endpoints() {
//!     println!("{} -> {}:{}", endpoint.name, endpoint.host, endpoint.port);
//! }
//! ```

mod document;
mod error;

pub use document::{
    ClusterDocument, DEFAULT_TRANSPORT_PORT, MemberEntry, RelaySection, ServerSection,
    TransportSection,
};
pub use error::{IntoTopologyReport, TopologyError, TopologyResult};

use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};
use tessera_kernel::config::{self, FileFormat};
use tracing::{debug, info, warn};

// ============================================================================
// Role / Relay
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Coordinator,
    Member,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Coordinator => f.write_str("coordinator"),
            Role::Member => f.write_str("member"),
        }
    }
}

impl FromStr for Role {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coordinator" | "master" => Ok(Role::Coordinator),
            "member" | "slave" => Ok(Role::Member),
            _ => Err(TopologyError::InvalidMode(s.to_string())),
        }
    }
}

/// Gateway to agents hosted outside this cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayInfo {
    pub address: String,
    pub site: String,
}

/// One outbound connection description per known node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportEndpoint {
    /// `C_` followed by the address with `.` replaced by `_`.
    pub name: String,
    pub host: String,
    pub port: u16,
}

impl TransportEndpoint {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            name: format!("C_{}", host.replace('.', "_")),
            host: host.to_string(),
            port,
        }
    }
}

// ============================================================================
// ClusterTopology
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterTopology {
    role: Role,
    self_address: String,
    coordinator: Option<String>,
    members: Vec<String>,
    relay: Option<RelayInfo>,
    transport_port: u16,
}

impl ClusterTopology {
    /// 从文件加载
    /// Reads and validates a cluster document; the format follows the file
    /// extension.
    pub fn from_file(path: impl AsRef<Path>) -> TopologyResult<Self> {
        let path = path.as_ref();
        let document: ClusterDocument = config::load_config(path)
            .change_context(TopologyError::Load)
            .attach(format!("file: {}", path.display()))?;
        Self::from_document(document).attach(format!("file: {}", path.display()))
    }

    pub fn parse(content: &str, format: FileFormat) -> TopologyResult<Self> {
        let document: ClusterDocument =
            config::from_str(content, format).change_context(TopologyError::Load)?;
        Self::from_document(document)
    }

    /// 校验文档
    /// Validates a parsed document.
    pub fn from_document(document: ClusterDocument) -> TopologyResult<Self> {
        let ClusterDocument {
            server,
            members,
            relay,
            transport,
        } = document;

        if server.mode.trim().is_empty() {
            return Err(Report::new(TopologyError::MissingField("server.mode")));
        }
        let role = server.mode.parse::<Role>().into_report()?;

        let self_address = server.address.trim().to_string();
        if self_address.is_empty() {
            return Err(Report::new(TopologyError::MissingField("server.address")));
        }

        let (coordinator, members) = match role {
            Role::Member => {
                let master = server
                    .master
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty())
                    .ok_or_else(|| Report::new(TopologyError::MissingCoordinator))
                    .attach(format!("server.address: {self_address}"))?;
                if !members.is_empty() {
                    warn!(
                        count = members.len(),
                        "Member node lists members; only the coordinator uses them"
                    );
                }
                (Some(master), Vec::new())
            }
            Role::Coordinator => {
                let mut addresses = Vec::with_capacity(members.len());
                for (i, entry) in members.into_iter().enumerate() {
                    let address = entry.address.trim().to_string();
                    if address.is_empty() {
                        return Err(Report::new(TopologyError::MissingField("members[].address"))
                            .attach(format!("index: {i}")));
                    }
                    if address != self_address && !addresses.contains(&address) {
                        addresses.push(address);
                    }
                }
                if addresses.is_empty() {
                    return Err(Report::new(TopologyError::MissingMembers));
                }
                (None, addresses)
            }
        };

        let relay = relay
            .map(|r| {
                let address = r.address.trim().to_string();
                let site = r.site.trim().to_string();
                if address.is_empty() {
                    Err(TopologyError::InvalidRelay("missing address".to_string()))
                } else if site.is_empty() {
                    Err(TopologyError::InvalidRelay("missing site".to_string()))
                } else {
                    Ok(RelayInfo { address, site })
                }
            })
            .transpose()
            .into_report()?;

        Ok(Self {
            role,
            self_address,
            coordinator,
            members,
            relay,
            transport_port: transport.port,
        })
    }

    /// A coordinator at `address` with the given members.
    pub fn coordinator<I, S>(address: &str, members: I) -> TopologyResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_document(ClusterDocument {
            server: ServerSection {
                mode: Role::Coordinator.to_string(),
                address: address.to_string(),
                master: None,
            },
            members: members
                .into_iter()
                .map(|a| MemberEntry { address: a.into() })
                .collect(),
            ..ClusterDocument::default()
        })
    }

    /// A member at `address` that reports to `coordinator`.
    pub fn member(address: &str, coordinator: &str) -> TopologyResult<Self> {
        Self::from_document(ClusterDocument {
            server: ServerSection {
                mode: Role::Member.to_string(),
                address: address.to_string(),
                master: Some(coordinator.to_string()),
            },
            ..ClusterDocument::default()
        })
    }

    pub fn with_relay(mut self, relay: RelayInfo) -> Self {
        self.relay = Some(relay);
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn self_address(&self) -> &str {
        &self.self_address
    }

    /// Members only.
    pub fn coordinator_address(&self) -> Option<&str> {
        self.coordinator.as_deref()
    }

    /// Coordinator only; empty on members.
    pub fn member_addresses(&self) -> &[String] {
        &self.members
    }

    pub fn relay(&self) -> Option<&RelayInfo> {
        self.relay.as_ref()
    }

    pub fn transport_port(&self) -> u16 {
        self.transport_port
    }

    /// Every node address this node knows about, itself included.
    pub fn cluster_nodes(&self) -> Vec<&str> {
        let mut nodes = vec![self.self_address.as_str()];
        nodes.extend(self.coordinator.as_deref());
        nodes.extend(self.members.iter().map(String::as_str));
        nodes
    }

    pub fn is_known_node(&self, address: &str) -> bool {
        self.cluster_nodes().contains(&address)
    }

    /// 传输端点
    /// Outbound connections the coordinator opens: itself plus every member.
    ///
    /// A member node has no member list; it logs a warning and gets none.
    pub fn transport_endpoints(&self) -> Vec<TransportEndpoint> {
        if self.members.is_empty() {
            warn!(
                role = %self.role,
                address = %self.self_address,
                "No cluster nodes to initialize transport endpoints for"
            );
            return Vec::new();
        }
        std::iter::once(&self.self_address)
            .chain(&self.members)
            .map(|host| TransportEndpoint::new(host, self.transport_port))
            .collect()
    }
}

// ============================================================================
// TopologyLoader
// ============================================================================

/// 进程级拓扑加载器
/// Once-per-process topology holder. The first successful load wins; later
/// loads return the stored topology without reading anything.
#[derive(Debug, Default)]
pub struct TopologyLoader {
    cell: OnceLock<Arc<ClusterTopology>>,
}

impl TopologyLoader {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    pub fn load(&self, path: impl AsRef<Path>) -> TopologyResult<Arc<ClusterTopology>> {
        if let Some(existing) = self.cell.get() {
            debug!("Cluster topology already loaded");
            return Ok(Arc::clone(existing));
        }
        let path = path.as_ref();
        let topology = ClusterTopology::from_file(path)?;
        info!(
            path = %path.display(),
            role = %topology.role(),
            address = %topology.self_address(),
            "Loaded cluster topology"
        );
        Ok(self.install(topology))
    }

    /// Stores an already-built topology, keeping the first one on a race.
    pub fn install(&self, topology: ClusterTopology) -> Arc<ClusterTopology> {
        Arc::clone(self.cell.get_or_init(|| Arc::new(topology)))
    }

    pub fn get(&self) -> Option<Arc<ClusterTopology>> {
        self.cell.get().cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}
