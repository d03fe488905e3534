//! Transfer engine for moving monetary value between CPF-keyed accounts
//!
//! The crate is organized in three strictly layered modules:
//!
//! - [`domain`]: amounts, CPF identifiers, accounts, and the transfer
//!   record with its status state machine
//! - [`storage`]: the [`storage::AccountStore`] and [`storage::TransferLog`]
//!   contracts plus concurrent in-memory implementations
//! - [`engine`]: the [`engine::TransferEngine`] orchestrating the
//!   create/revert protocol
//!
//! Account CRUD, authentication, and HTTP routing are external
//! collaborators; the engine only resolves accounts and adjusts balances
//! through the store's atomic conditional-adjust primitive, which is what
//! keeps balances non-negative under concurrent invocation.
//!
//! ```
//! use remit::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let accounts = MemoryAccounts::new();
//! let sender: Cpf = "12345678909".parse()?;
//! let receiver: Cpf = "52998224725".parse()?;
//! accounts.seed(Account::new(1, sender.clone(), Centavos::from_decimal_str("200.00")?)?)?;
//! accounts.seed(Account::new(2, receiver.clone(), Centavos::from_decimal_str("100.00")?)?)?;
//!
//! let engine = TransferEngine::new(accounts, MemoryTransferLog::new());
//!
//! let tx = engine
//!     .create_transfer(&sender, &receiver, Centavos::from_decimal_str("100.00")?, TransferKind::Transfer)
//!     .await?;
//! assert_eq!(tx.status(), TransferStatus::Completed);
//!
//! let reverted = engine.revert_transfer(tx.id()).await?;
//! assert_eq!(reverted.status(), TransferStatus::Reverted);
//! # Ok(())
//! # }
//! ```

pub mod domain;
pub mod engine;
pub mod prelude;
pub mod storage;
