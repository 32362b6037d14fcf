//! Serde shape of the cluster configuration document.
//!
//! ```yaml
//! server:
//!   mode: coordinator        # or member (aliases: master / slave)
//!   address: 192.168.0.10
//!   master: 192.168.0.1      # members only
//! members:                   # coordinator only
//!   - address: 192.168.0.11
//! relay:                     # optional
//!   address: 10.0.0.1
//!   site: east
//! transport:                 # optional
//!   port: 4447
//! ```

use serde::{Deserialize, Serialize};

/// Port used for inter-node connections unless the document overrides it.
pub const DEFAULT_TRANSPORT_PORT: u16 = 4447;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterDocument {
    pub server: ServerSection,
    #[serde(default, alias = "slaves")]
    pub members: Vec<MemberEntry>,
    #[serde(default)]
    pub relay: Option<RelaySection>,
    #[serde(default)]
    pub transport: TransportSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub master: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberEntry {
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelaySection {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub site: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSection {
    pub port: u16,
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            port: DEFAULT_TRANSPORT_PORT,
        }
    }
}
