//! Results of executing an envelope.

use thiserror::Error;

use crate::crypto::KeyError;
use crate::execution::transport::TransportError;
use crate::transaction::envelope::TransactionError;
use crate::transaction::id::{AccountId, TransactionId};
use crate::transaction::status::{Status, StatusClass};

/// A successful execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionResponse {
    /// Node that accepted the transaction.
    pub node_id: AccountId,
    pub transaction_id: TransactionId,
    /// SHA-384 of the signed body submitted to `node_id`.
    pub transaction_hash: Vec<u8>,
    pub status: Status,
    pub payload: Vec<u8>,
}

/// How the engine treats a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptDecision {
    Success,
    Retry,
    Fail,
}

impl From<StatusClass> for AttemptDecision {
    fn from(class: StatusClass) -> Self {
        match class {
            StatusClass::Success => AttemptDecision::Success,
            StatusClass::Retryable => AttemptDecision::Retry,
            StatusClass::Fatal => AttemptDecision::Fail,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error("transaction {transaction_id} failed with status {status}")]
    Status {
        status: Status,
        transaction_id: TransactionId,
    },

    #[error("gave up after {attempts} attempts (last status: {last_status:?}, last error: {last_error:?})")]
    MaxAttemptsExceeded {
        attempts: u32,
        last_status: Option<Status>,
        last_error: Option<String>,
    },

    /// Caller cancellation, the request deadline or an attempt timeout.
    #[error("execution cancelled")]
    Cancelled,

    #[error(transparent)]
    Transport(TransportError),

    #[error("node {0} is not part of the network")]
    UnknownNode(AccountId),

    #[error(transparent)]
    Key(#[from] KeyError),
}

impl ExecuteError {
    /// Status the network returned, when the failure came from one.
    pub fn status(&self) -> Option<Status> {
        match self {
            ExecuteError::Status { status, .. } => Some(*status),
            ExecuteError::MaxAttemptsExceeded { last_status, .. } => *last_status,
            _ => None,
        }
    }
}

pub type ExecuteResult<T> = Result<T, ExecuteError>;
