use thiserror::Error;

use crate::domain::{Cpf, TransferStatus};
use crate::storage::StorageError;

/// Transport-level classification of an engine failure
///
/// The Request Gateway maps these to response classes; exact status codes
/// are its concern, not the engine's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed or unsatisfiable request (invalid amount, insufficient
    /// funds, revert of a non-completed transfer)
    InvalidRequest,
    /// Sender, receiver, or transfer record absent
    NotFound,
    /// Underlying storage failed
    Internal,
}

/// Engine-level errors for the transfer protocol
///
/// Every variant carries the implicated CPF or transfer id so the gateway
/// can produce an actionable message. Nothing is retried by the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("transfer amount must be strictly positive")]
    InvalidAmount,

    #[error("sender not found: {0}")]
    SenderNotFound(Cpf),

    #[error("receiver not found: {0}")]
    ReceiverNotFound(Cpf),

    #[error("insufficient funds on account {cpf}")]
    InsufficientFunds { cpf: Cpf },

    #[error("transfer not found: {0}")]
    TransferNotFound(u64),

    #[error("transfer {id} cannot be reverted from status {status}")]
    NotRevertable { id: u64, status: TransferStatus },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl TransferError {
    /// Classification consumed by the Request Gateway
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidAmount
            | Self::InsufficientFunds { .. }
            | Self::NotRevertable { .. } => ErrorClass::InvalidRequest,
            Self::SenderNotFound(_) | Self::ReceiverNotFound(_) | Self::TransferNotFound(_) => {
                ErrorClass::NotFound
            }
            Self::Storage(_) => ErrorClass::Internal,
        }
    }
}
