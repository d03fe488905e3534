use thiserror::Error;

use crate::domain::{Cpf, DomainError, TransferStatus};

/// Storage-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("entity not found")]
    NotFound,

    #[error("CPF already registered: {0}")]
    DuplicateCpf(Cpf),

    #[error("status conflict: record is {actual}")]
    StatusConflict { actual: TransferStatus },

    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}
