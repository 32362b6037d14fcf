//! Agent 错误类型定义
//! Errors raised by agent code
//!
//! A handler returning one of these is logged by the runtime together with
//! the agent and message that caused it; the message still counts as
//! consumed.

use crate::endpoint::DeliveryError;
use thiserror::Error;

/// Agent 操作结果类型
pub type AgentResult<T> = Result<T, AgentError>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AgentError {
    /// `init` rejected its arguments or could not set the agent up.
    #[error("Agent initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Missing init argument '{0}'")]
    MissingArgument(String),

    /// Message handling failed.
    #[error("Agent execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A timed `receive` came back empty.
    #[error("No reply within {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Message content did not decode.
    #[error("Content error: {0}")]
    Content(#[from] serde_json::Error),

    /// An outgoing message could not be handed off.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl AgentError {
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::ExecutionFailed(msg.into())
    }

    /// Whether the error came from `init` rather than from a handler.
    pub fn is_init(&self) -> bool {
        matches!(self, Self::InitializationFailed(_) | Self::MissingArgument(_))
    }
}
