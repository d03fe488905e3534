use thiserror::Error;

/// Domain-level errors representing business rule violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("invalid amount")]
    InvalidAmount,

    #[error("invalid CPF: {0}")]
    InvalidIdentifier(String),

    #[error("invalid transfer kind: {0}")]
    InvalidKind(String),

    #[error("arithmetic overflow")]
    Overflow,
}
