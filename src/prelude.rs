//! Prelude module for convenient imports
//!
//! Import everything you need with: `use remit::prelude::*;`

// Domain types
pub use crate::domain::{
    Account, Amount, Centavos, Cpf, DomainError, Transfer, TransferKind, TransferStatus,
};

// Storage types
pub use crate::storage::{
    AccountStore, MemoryAccounts, MemoryTransferLog, StorageError, TransferLog,
};

// Engine types
pub use crate::engine::{
    ErrorClass, NoopSink, TelemetrySink, TracingSink, TransferEngine, TransferError,
};
