//! BDI 环境接口
//! Reasoning-engine environment seam
//!
//! An [`Environment`] serves percepts to agents and executes their actions
//! asynchronously. Completion is reported back to the acting agent as an
//! ordinary ACL message, built by [`action_feedback`].

use crate::aid::Aid;
use crate::message::{AclMessage, Performative};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ontology of the message that reports an executed action.
pub const ACTION_FEEDBACK_ONTOLOGY: &str = "action-feedback";

/// Ontology of the message broadcast when the environment changes.
pub const ENVIRONMENT_CHANGED_ONTOLOGY: &str = "environment-changed";

/// A literal the environment exposes to an agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percept(pub String);

impl fmt::Display for Percept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An action an agent asks the environment to perform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action(pub String);

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 外部环境
/// External environment shared by reasoning agents
#[async_trait]
pub trait Environment: Send + Sync {
    /// Current percepts for `aid`.
    async fn percepts(&self, aid: &Aid) -> Vec<Percept>;

    /// Queues `action` for execution. The outcome is delivered later through
    /// [`action_feedback`] carrying `reply_with` as its `in_reply_to`.
    async fn schedule_action(&self, aid: &Aid, action: Action, reply_with: &str);
}

/// INFORM on success, FAILURE otherwise, addressed to the acting agent.
pub fn action_feedback(aid: &Aid, success: bool, reply_with: &str) -> AclMessage {
    let performative = if success {
        Performative::Inform
    } else {
        Performative::Failure
    };
    AclMessage::new(performative)
        .with_receiver(aid.clone())
        .with_in_reply_to(reply_with)
        .with_ontology(ACTION_FEEDBACK_ONTOLOGY)
}

/// One INFORM to every listed agent.
pub fn environment_changed<'a>(agents: impl IntoIterator<Item = &'a Aid>) -> AclMessage {
    AclMessage::new(Performative::Inform)
        .with_receivers(agents.into_iter().cloned())
        .with_ontology(ENVIRONMENT_CHANGED_ONTOLOGY)
}
