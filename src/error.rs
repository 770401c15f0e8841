//! Crate-level error type.

use thiserror::Error;

use crate::config::loader::ConfigError;
use crate::crypto::der::DerError;
use crate::crypto::mnemonic::MnemonicError;
use crate::crypto::KeyError;
use crate::ethereum::EthError;
use crate::execution::ExecuteError;
use crate::network::{NetworkError, NodeListError};
use crate::transaction::{ParseIdError, TransactionError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Der(#[from] DerError),

    #[error(transparent)]
    Mnemonic(#[from] MnemonicError),

    #[error(transparent)]
    Eth(#[from] EthError),

    #[error(transparent)]
    Id(#[from] ParseIdError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    NodeList(#[from] NodeListError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Execute(#[from] ExecuteError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
