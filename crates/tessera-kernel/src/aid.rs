//! Agent 标识符
//! Agent identifiers
//!
//! [`Aid`] is the universal routing key of the runtime. It is immutable and
//! compared structurally over all four of its parts, so two identifiers built
//! from the same node, class and name always address the same agent.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum AidError {
    /// The agent class string has no `-` separator.
    #[error("Malformed agent class '{0}': expected 'module-implementation'")]
    MalformedAgentClass(String),

    /// One of the parts is empty.
    #[error("Agent class part '{0}' must not be empty")]
    EmptyPart(&'static str),
}

// ============================================================================
// AgentClass
// ============================================================================

/// Agent 类别
/// Agent class
///
/// 指定可部署模块与其中的具体实现
/// Names the deployable module and the concrete behaviour inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentClass {
    module: String,
    implementation: String,
}

impl AgentClass {
    pub fn new(module: impl Into<String>, implementation: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            implementation: implementation.into(),
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn implementation(&self) -> &str {
        &self.implementation
    }
}

impl fmt::Display for AgentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.module, self.implementation)
    }
}

impl FromStr for AgentClass {
    type Err = AidError;

    /// Splits at the first `-`; everything after it belongs to the
    /// implementation name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (module, implementation) = s
            .split_once('-')
            .ok_or_else(|| AidError::MalformedAgentClass(s.to_string()))?;
        if module.is_empty() {
            return Err(AidError::EmptyPart("module"));
        }
        if implementation.is_empty() {
            return Err(AidError::EmptyPart("implementation"));
        }
        Ok(Self::new(module, implementation))
    }
}

// ============================================================================
// Aid
// ============================================================================

/// Agent 标识符
/// Agent identifier
///
/// `{node, module, agent_class, name}`. Never reused for two live instances
/// and fixed for the lifetime of the instance it names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Aid {
    node: String,
    module: String,
    agent_class: String,
    name: String,
}

impl Aid {
    /// Builds the identifier of agent `name` of class `class` hosted on `node`.
    pub fn new(node: impl Into<String>, class: &AgentClass, name: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            module: class.module.clone(),
            agent_class: class.implementation.clone(),
            name: name.into(),
        }
    }

    pub fn from_parts(
        node: impl Into<String>,
        module: impl Into<String>,
        agent_class: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            node: node.into(),
            module: module.into(),
            agent_class: agent_class.into(),
            name: name.into(),
        }
    }

    /// Address of the node hosting the agent.
    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// Implementation name of the agent's class.
    pub fn agent_class_name(&self) -> &str {
        &self.agent_class
    }

    /// Runtime (instance) name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn agent_class(&self) -> AgentClass {
        AgentClass::new(self.module.clone(), self.agent_class.clone())
    }

    /// Same class and name, hosted elsewhere.
    pub fn on_node(&self, node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            ..self.clone()
        }
    }
}

impl fmt::Display for Aid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}/{}-{}",
            self.name, self.node, self.module, self.agent_class
        )
    }
}
