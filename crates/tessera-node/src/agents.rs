//! Ping-pong demonstration agents.
//!
//! For each exchange `Ping` sends a REQUEST to `Pong` and waits inline for
//! the reply with [`Wait::For`]. `Pong` replies INFORM to every REQUEST it
//! gets.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tessera_runtime::{
    AclMessage, Agent, AgentClass, AgentContext, AgentError, AgentInitArgs, AgentNode,
    AgentFactory, AgentResult, Aid, FnAgentFactory, Performative, RegistryResult, Wait,
};
use tracing::{debug, info, warn};

pub const MODULE: &str = "demo";

const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

pub fn ping_class() -> AgentClass {
    AgentClass::new(MODULE, "Ping")
}

pub fn pong_class() -> AgentClass {
    AgentClass::new(MODULE, "Pong")
}

// ============================================================================
// Pong
// ============================================================================

#[derive(Default)]
pub struct Pong {
    replies: u64,
}

#[async_trait]
impl Agent for Pong {
    async fn on_message(&mut self, ctx: &dyn AgentContext, msg: Arc<AclMessage>) -> AgentResult<()> {
        if msg.performative != Performative::Request || !msg.can_reply() {
            debug!(aid = %ctx.aid(), performative = %msg.performative, "Pong ignored message");
            return Ok(());
        }

        self.replies += 1;
        let reply = msg
            .make_reply(Performative::Inform)
            .with_sender(ctx.aid().clone())
            .with_content(format!("pong #{}", self.replies));
        ctx.post(reply).await;
        Ok(())
    }
}

// ============================================================================
// Ping
// ============================================================================

pub struct Ping {
    pong: Option<Aid>,
    sent: u64,
    completed: Arc<AtomicUsize>,
}

impl Ping {
    pub fn new(completed: Arc<AtomicUsize>) -> Self {
        Self {
            pong: None,
            sent: 0,
            completed,
        }
    }
}

#[async_trait]
impl Agent for Ping {
    /// Expects `pong=<instance name>` naming a Pong on the same node.
    async fn init(&mut self, ctx: &dyn AgentContext, args: AgentInitArgs) -> AgentResult<()> {
        let name = args.require("pong")?;
        self.pong = Some(Aid::new(ctx.node(), &pong_class(), name));
        Ok(())
    }

    /// A REQUEST whose content is a round count (default 1) runs that many
    /// ping/pong exchanges back to back.
    async fn on_message(&mut self, ctx: &dyn AgentContext, msg: Arc<AclMessage>) -> AgentResult<()> {
        if msg.performative != Performative::Request {
            return Ok(());
        }
        let rounds = match msg.content.as_deref() {
            Some(content) => content
                .trim()
                .parse::<usize>()
                .map_err(|e| AgentError::InvalidInput(format!("round count '{content}': {e}")))?,
            None => 1,
        };
        for _ in 0..rounds {
            self.exchange(ctx).await?;
        }
        Ok(())
    }
}

impl Ping {
    async fn exchange(&mut self, ctx: &dyn AgentContext) -> AgentResult<()> {
        let pong = self
            .pong
            .clone()
            .ok_or_else(|| AgentError::execution("pong target not initialized"))?;

        self.sent += 1;
        let token = format!("ping-{}", self.sent);
        let request = AclMessage::new(Performative::Request)
            .with_sender(ctx.aid().clone())
            .with_receiver(pong)
            .with_new_conversation()
            .with_reply_with(&token)
            .with_content("ping");

        let report = ctx.post(request).await;
        if let Some((_, error)) = report.failed.into_iter().next() {
            return Err(error.into());
        }

        match ctx.receive(Wait::For(REPLY_TIMEOUT)).await {
            Some(reply) if reply.in_reply_to.as_deref() == Some(token.as_str()) => {
                self.completed.fetch_add(1, Ordering::SeqCst);
                info!(
                    aid = %ctx.aid(),
                    content = reply.content.as_deref().unwrap_or_default(),
                    "Ping received reply"
                );
                Ok(())
            }
            Some(other) => {
                warn!(aid = %ctx.aid(), performative = %other.performative, "Unexpected message while waiting for pong");
                Ok(())
            }
            None => Err(AgentError::Timeout {
                duration_ms: REPLY_TIMEOUT.as_millis() as u64,
            }),
        }
    }
}

/// Factories for both demo classes. `completed` counts finished exchanges.
pub fn factories(completed: Arc<AtomicUsize>) -> [Arc<dyn AgentFactory>; 2] {
    let ping: Arc<dyn AgentFactory> = Arc::new(
        FnAgentFactory::new(ping_class(), move || Ping::new(Arc::clone(&completed)))
            .with_description("Sends REQUEST to a Pong and waits for the reply"),
    );
    let pong: Arc<dyn AgentFactory> = Arc::new(
        FnAgentFactory::new(pong_class(), Pong::default)
            .with_description("Replies INFORM to every REQUEST"),
    );
    [ping, pong]
}

/// Starts one Ping and one Pong on `node` and asks Ping for `rounds`
/// exchanges.
pub async fn run_ping_pong(node: &AgentNode, rounds: usize) -> RegistryResult<Aid> {
    let registry = node.registry();
    registry
        .start(&pong_class(), "pong", AgentInitArgs::new())
        .await?;
    let ping = registry
        .start(&ping_class(), "ping", AgentInitArgs::new().with("pong", "pong"))
        .await?;

    let kick = AclMessage::new(Performative::Request)
        .with_receiver(ping.clone())
        .with_content(rounds.to_string());
    let report = node.router().post(kick).await;
    debug!(rounds, delivered = report.delivered.len(), "Ping-pong started");
    Ok(ping)
}
