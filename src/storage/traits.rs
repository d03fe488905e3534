use std::sync::Arc;

use async_trait::async_trait;

use super::error::StorageError;
use crate::domain::{Account, Amount, Cpf, Transfer, TransferKind, TransferStatus};

/// Storage contract for account balances
///
/// `adjust_balance` is the only mutation the engine performs, and it must be
/// atomic: the sufficiency check and the write happen under one lock, never
/// as a read followed by a separate write. That single primitive is what
/// keeps concurrent debits of the same sender from overdrawing it.
#[async_trait]
pub trait AccountStore<A: Amount>: Send + Sync {
    /// Resolve an account by its CPF; `Ok(None)` when unknown
    async fn find_by_cpf(&self, cpf: &Cpf) -> Result<Option<Account<A>>, StorageError>;

    /// Atomically apply `balance += delta` (delta may be negative)
    ///
    /// Fails the whole call, with no partial write, when the result would be
    /// negative (`Domain(InsufficientFunds)`), on arithmetic overflow
    /// (`Domain(Overflow)`), or when the id is unknown (`NotFound`).
    /// Returns the account as stored after the adjustment.
    async fn adjust_balance(&self, id: u64, delta: A) -> Result<Account<A>, StorageError>;
}

/// Storage contract for the transfer log
///
/// Records are append-plus-status-transition only; nothing is ever deleted.
#[async_trait]
pub trait TransferLog<A: Amount>: Send + Sync {
    /// Persist a new record in the `created` state, assigning its id
    async fn insert(
        &self,
        sender_cpf: Cpf,
        receiver_cpf: Cpf,
        amount: A,
        kind: TransferKind,
    ) -> Result<Transfer<A>, StorageError>;

    /// Fetch a record by id; `Ok(None)` when unknown
    async fn get(&self, id: u64) -> Result<Option<Transfer<A>>, StorageError>;

    /// Atomically move a record from `expected` to `next`
    ///
    /// The stored status is re-verified under the write lock; a record in any
    /// other state fails with `StatusConflict { actual }` and is left
    /// untouched. `updated_at` is refreshed on success. The engine owns the
    /// protocol ordering; the log only guarantees atomicity of the swap.
    async fn transition(
        &self,
        id: u64,
        expected: TransferStatus,
        next: TransferStatus,
    ) -> Result<Transfer<A>, StorageError>;
}

// Stores are shared across concurrent request handlers through Arc
#[async_trait]
impl<A: Amount, S: AccountStore<A>> AccountStore<A> for Arc<S> {
    async fn find_by_cpf(&self, cpf: &Cpf) -> Result<Option<Account<A>>, StorageError> {
        (**self).find_by_cpf(cpf).await
    }

    async fn adjust_balance(&self, id: u64, delta: A) -> Result<Account<A>, StorageError> {
        (**self).adjust_balance(id, delta).await
    }
}

#[async_trait]
impl<A: Amount, L: TransferLog<A>> TransferLog<A> for Arc<L> {
    async fn insert(
        &self,
        sender_cpf: Cpf,
        receiver_cpf: Cpf,
        amount: A,
        kind: TransferKind,
    ) -> Result<Transfer<A>, StorageError> {
        (**self).insert(sender_cpf, receiver_cpf, amount, kind).await
    }

    async fn get(&self, id: u64) -> Result<Option<Transfer<A>>, StorageError> {
        (**self).get(id).await
    }

    async fn transition(
        &self,
        id: u64,
        expected: TransferStatus,
        next: TransferStatus,
    ) -> Result<Transfer<A>, StorageError> {
        (**self).transition(id, expected, next).await
    }
}
