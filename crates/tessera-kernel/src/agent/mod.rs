//! 统一 Agent 接口
//! Unified agent interface
//!
//! Kernel 只定义抽象；邮箱、注册中心与路由实现位于运行时层 (tessera-runtime)。
//! The kernel only defines the abstractions; mailbox, registry and router
//! implementations live in the runtime layer (tessera-runtime).

pub mod error;
mod init_args;

pub use error::{AgentError, AgentResult};
pub use init_args::AgentInitArgs;

use crate::aid::{AgentClass, Aid};
use crate::endpoint::PostReport;
use crate::message::AclMessage;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Agent
// ============================================================================

/// 托管的 Agent 行为
/// Hosted agent behaviour
///
/// The runtime never runs two of these methods concurrently on the same
/// instance: `init` completes before the first message, messages arrive one
/// at a time in enqueue order, and `terminate` waits for the in-flight
/// handler to return.
///
/// # 示例
/// # Example
///
/// ```rust,ignore
/// struct Echo;
///
/// #[async_trait]
/// impl Agent for Echo {
///     async fn on_message(&mut self, ctx: &dyn AgentContext, msg: Arc<AclMessage>) -> AgentResult<()> {
///         let reply = msg.make_reply(Performative::Inform).with_sender(ctx.aid().clone());
///         ctx.post(reply).await;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Agent: Send + 'static {
    /// 初始化
    /// Called once, before any message is delivered.
    async fn init(&mut self, ctx: &dyn AgentContext, args: AgentInitArgs) -> AgentResult<()> {
        let _ = (ctx, args);
        Ok(())
    }

    /// 处理消息
    /// Handles one message. An `Err` (or a panic) is logged by the runtime
    /// and the message counts as consumed.
    async fn on_message(&mut self, ctx: &dyn AgentContext, msg: Arc<AclMessage>)
    -> AgentResult<()>;

    /// 终止
    /// Teardown hook; no message is delivered afterwards.
    async fn terminate(&mut self) {}
}

// ============================================================================
// AgentContext
// ============================================================================

/// How long [`AgentContext::receive`] may wait for the next message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Take the queued head, if any, without waiting.
    Immediate,
    /// Wait at most this long.
    For(Duration),
    /// Wait until a message arrives or the agent is terminated.
    Forever,
}

/// 运行时提供给 Agent 的上下文
/// Runtime services available to an agent while it handles a message
#[async_trait]
pub trait AgentContext: Send + Sync {
    /// The agent's own identifier.
    fn aid(&self) -> &Aid;

    /// Address of the hosting node.
    fn node(&self) -> &str {
        self.aid().node()
    }

    /// Posts a message through the node's router. Fire-and-forget: the report
    /// only says which receivers were handed off.
    async fn post(&self, msg: AclMessage) -> PostReport;

    /// Takes the next message from this agent's own mailbox, bypassing the
    /// handler dispatch. Returns `None` on timeout or termination.
    async fn receive(&self, wait: Wait) -> Option<Arc<AclMessage>>;
}

// ============================================================================
// AgentFactory
// ============================================================================

/// Agent 工厂 Trait
/// Agent Factory Trait
///
/// 负责创建特定类别的 Agent 实例
/// Creates instances of one deployable [`AgentClass`].
#[async_trait]
pub trait AgentFactory: Send + Sync {
    /// 工厂负责的类别
    /// The class this factory instantiates
    fn agent_class(&self) -> &AgentClass;

    /// 创建 Agent 实例
    /// Create an agent instance
    async fn create(&self) -> AgentResult<Box<dyn Agent>>;

    /// 工厂描述
    /// Factory description
    fn description(&self) -> Option<&str> {
        None
    }
}

/// Factory backed by a constructor closure.
pub struct FnAgentFactory<F> {
    class: AgentClass,
    description: Option<String>,
    make: F,
}

impl<F, A> FnAgentFactory<F>
where
    F: Fn() -> A + Send + Sync,
    A: Agent,
{
    pub fn new(class: AgentClass, make: F) -> Self {
        Self {
            class,
            description: None,
            make,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[async_trait]
impl<F, A> AgentFactory for FnAgentFactory<F>
where
    F: Fn() -> A + Send + Sync,
    A: Agent,
{
    fn agent_class(&self) -> &AgentClass {
        &self.class
    }

    async fn create(&self) -> AgentResult<Box<dyn Agent>> {
        Ok(Box::new((self.make)()))
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}
