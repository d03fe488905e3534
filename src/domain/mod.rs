pub mod account;
pub mod amount;
pub mod cpf;
pub mod error;
pub mod transfer;

// Re-export commonly used types
pub use account::Account;
pub use amount::{Amount, Centavos};
pub use cpf::Cpf;
pub use error::DomainError;
pub use transfer::{Transfer, TransferKind, TransferStatus};
