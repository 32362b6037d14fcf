//! Environment bridge
//!
//! Puts a user [`Environment`] behind the node's router: percept queries and
//! action scheduling pass straight through, and completion events become ACL
//! messages posted to the agents concerned.

use crate::router::MessageRouter;
use async_trait::async_trait;
use std::sync::Arc;
use tessera_kernel::Aid;
use tessera_kernel::endpoint::PostReport;
use tessera_kernel::environment::{self, Action, Environment, Percept};
use tracing::debug;

pub struct EnvironmentBridge {
    environment: Arc<dyn Environment>,
    router: Arc<MessageRouter>,
    /// Sender stamped on feedback messages.
    sender: Option<Aid>,
}

impl EnvironmentBridge {
    pub fn new(environment: Arc<dyn Environment>, router: Arc<MessageRouter>) -> Self {
        Self {
            environment,
            router,
            sender: None,
        }
    }

    pub fn with_sender(mut self, sender: Aid) -> Self {
        self.sender = Some(sender);
        self
    }

    /// 动作完成
    /// Reports the outcome of an action to the agent that requested it:
    /// INFORM on success, FAILURE otherwise, `in_reply_to` = `reply_with`.
    pub async fn action_executed(&self, aid: &Aid, success: bool, reply_with: &str) -> PostReport {
        debug!(aid = %aid, success, reply_with, "Action executed");
        let mut msg = environment::action_feedback(aid, success, reply_with);
        msg.sender = self.sender.clone();
        self.router.post(msg).await
    }

    /// 环境变化
    /// One INFORM to every listed agent.
    pub async fn environment_changed(&self, agents: &[Aid]) -> PostReport {
        if agents.is_empty() {
            return PostReport::default();
        }
        debug!(count = agents.len(), "Environment changed");
        let mut msg = environment::environment_changed(agents);
        msg.sender = self.sender.clone();
        self.router.post(msg).await
    }
}

#[async_trait]
impl Environment for EnvironmentBridge {
    async fn percepts(&self, aid: &Aid) -> Vec<Percept> {
        self.environment.percepts(aid).await
    }

    async fn schedule_action(&self, aid: &Aid, action: Action, reply_with: &str) {
        debug!(aid = %aid, action = %action, reply_with, "Scheduling action");
        self.environment.schedule_action(aid, action, reply_with).await;
    }
}
