//! Mapper error types

use contracts::{ContractError, HandshakeKind};
use thiserror::Error;

/// Mapper-service errors; each one ends the service loop
#[derive(Debug, Error)]
pub enum MapperError {
    /// Receive or acknowledge failed
    #[error("handshake channel failed: {0}")]
    Channel(#[source] ContractError),

    /// Message that cannot be classified
    #[error("malformed request: {0}")]
    Protocol(#[source] ContractError),

    /// Backend raised while handling a request
    #[error("backend '{backend}' failed on {kind} request: {source}")]
    Backend {
        backend: String,
        kind: HandshakeKind,
        #[source]
        source: ContractError,
    },

    /// Tracker closed the link without the terminal message
    #[error("tracker disconnected without shutdown after {acknowledged} acknowledged requests")]
    TrackerGone { acknowledged: u64 },

    /// Service task panicked or was cancelled
    #[error("mapper task failed: {0}")]
    Join(String),
}

impl MapperError {
    pub(crate) fn backend(backend: &str, kind: HandshakeKind, source: ContractError) -> Self {
        Self::Backend {
            backend: backend.to_string(),
            kind,
            source,
        }
    }
}
