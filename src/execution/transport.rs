//! The seam between the execution engine and the wire.

use async_trait::async_trait;
use thiserror::Error;

use crate::network::Node;
use crate::transaction::status::Status;

/// What a node answered for one submitted body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: Status,
    /// Response payload, opaque to the engine.
    pub payload: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: Status, payload: Vec<u8>) -> Self {
        Self { status, payload }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("node unavailable: {0}")]
    Unavailable(String),

    #[error("transport timed out")]
    Timeout,

    #[error("node resource exhausted")]
    ResourceExhausted,

    #[error("internal transport error: {0}")]
    Internal(String),

    #[error("transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Errors after which another node may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransportError::Other(_))
    }
}

/// Sends one encoded signed body to one node.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, node: &Node, request: Vec<u8>) -> Result<TransportResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_transport_errors() {
        assert!(TransportError::Unavailable("refused".into()).is_retryable());
        assert!(TransportError::Timeout.is_retryable());
        assert!(TransportError::ResourceExhausted.is_retryable());
        assert!(TransportError::Internal("reset".into()).is_retryable());
        assert!(!TransportError::Other("bad request".into()).is_retryable());
    }
}
