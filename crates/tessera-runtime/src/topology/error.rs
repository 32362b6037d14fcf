//! Typed errors and result aliases for cluster topology loading.

use error_stack::Report;
use thiserror::Error;

/// Error-stack backed result alias for topology operations.
///
/// Equivalent to `Result<T, error_stack::Report<TopologyError>>`.
pub type TopologyResult<T> = ::std::result::Result<T, Report<TopologyError>>;

/// Extension trait to convert `Result<T, TopologyError>` into [`TopologyResult<T>`].
pub trait IntoTopologyReport<T> {
    /// Wrap the error in an `error_stack::Report`.
    fn into_report(self) -> TopologyResult<T>;
}

impl<T> IntoTopologyReport<T> for ::std::result::Result<T, TopologyError> {
    #[inline]
    fn into_report(self) -> TopologyResult<T> {
        self.map_err(Report::new)
    }
}

/// Invalid or missing cluster configuration. Always fatal to startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TopologyError {
    /// The document could not be read or parsed.
    #[error("Failed to load cluster configuration")]
    Load,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid mode: '{0}' (expected coordinator or member)")]
    InvalidMode(String),

    /// A member node names no coordinator.
    #[error("Member node requires the coordinator's address")]
    MissingCoordinator,

    /// A coordinator node lists no members.
    #[error("Coordinator node requires at least one member address")]
    MissingMembers,

    #[error("Invalid relay: {0}")]
    InvalidRelay(String),
}
