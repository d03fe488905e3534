use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use super::error::StorageError;
use super::traits::{AccountStore, TransferLog};
use crate::domain::{Account, Amount, Cpf, DomainError, Transfer, TransferKind, TransferStatus};

/// Concurrent in-memory account store backed by DashMap
///
/// `seed` and `remove` are the Account Directory's hooks; the engine itself
/// only reads and adjusts.
pub struct MemoryAccounts<A: Amount> {
    accounts: DashMap<u64, Account<A>>,
    cpf_index: DashMap<Cpf, u64>,
}

impl<A: Amount> MemoryAccounts<A> {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            cpf_index: DashMap::new(),
        }
    }

    /// Register an account (Account Directory hook)
    pub fn seed(&self, account: Account<A>) -> Result<(), StorageError> {
        match self.cpf_index.entry(account.cpf().clone()) {
            dashmap::Entry::Occupied(_) => Err(StorageError::DuplicateCpf(account.cpf().clone())),
            dashmap::Entry::Vacant(e) => {
                e.insert(account.id());
                self.accounts.insert(account.id(), account);
                Ok(())
            }
        }
    }

    /// Deregister an account (Account Directory hook)
    pub fn remove(&self, cpf: &Cpf) -> Result<Account<A>, StorageError> {
        let (_, id) = self.cpf_index.remove(cpf).ok_or(StorageError::NotFound)?;
        let (_, account) = self.accounts.remove(&id).ok_or(StorageError::NotFound)?;
        Ok(account)
    }

    /// Snapshot of one account by id, for assertions and reporting
    pub fn get(&self, id: u64) -> Option<Account<A>> {
        self.accounts.get(&id).map(|r| r.value().clone())
    }

    /// Sum of all stored balances
    ///
    /// Iteration holds brief per-shard locks; a sum taken while transfers are
    /// in flight is a consistent-per-account, not globally frozen, view.
    pub fn total_balance(&self) -> Option<A> {
        self.accounts
            .iter()
            .try_fold(A::zero(), |acc, entry| acc.checked_add(entry.balance()))
    }
}

impl<A: Amount> Default for MemoryAccounts<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<A: Amount> AccountStore<A> for MemoryAccounts<A> {
    async fn find_by_cpf(&self, cpf: &Cpf) -> Result<Option<Account<A>>, StorageError> {
        let Some(id) = self.cpf_index.get(cpf).map(|r| *r.value()) else {
            return Ok(None);
        };
        Ok(self.accounts.get(&id).map(|r| r.value().clone()))
    }

    async fn adjust_balance(&self, id: u64, delta: A) -> Result<Account<A>, StorageError> {
        // The get_mut guard holds the shard lock for the whole
        // check-then-write, which is what makes the adjust conditional
        // rather than a racy read-modify-write.
        let mut entry = self.accounts.get_mut(&id).ok_or(StorageError::NotFound)?;
        let account = entry.value_mut();

        let next = account
            .balance()
            .checked_add(delta)
            .ok_or(DomainError::Overflow)?;
        if next < A::zero() {
            return Err(DomainError::InsufficientFunds.into());
        }

        account.set_balance(next);
        Ok(account.clone())
    }
}

/// Concurrent in-memory transfer log backed by DashMap
///
/// Ids are assigned from a monotonic counter; records are never removed.
pub struct MemoryTransferLog<A: Amount> {
    records: DashMap<u64, Transfer<A>>,
    next_id: AtomicU64,
}

impl<A: Amount> MemoryTransferLog<A> {
    /// Create an empty log
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of records ever inserted
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<A: Amount> Default for MemoryTransferLog<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<A: Amount> TransferLog<A> for MemoryTransferLog<A> {
    async fn insert(
        &self,
        sender_cpf: Cpf,
        receiver_cpf: Cpf,
        amount: A,
        kind: TransferKind,
    ) -> Result<Transfer<A>, StorageError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let record = Transfer::new(id, sender_cpf, receiver_cpf, amount, kind);
        self.records.insert(id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: u64) -> Result<Option<Transfer<A>>, StorageError> {
        Ok(self.records.get(&id).map(|r| r.value().clone()))
    }

    async fn transition(
        &self,
        id: u64,
        expected: TransferStatus,
        next: TransferStatus,
    ) -> Result<Transfer<A>, StorageError> {
        let mut entry = self.records.get_mut(&id).ok_or(StorageError::NotFound)?;
        let record = entry.value_mut();

        // Re-verified under the write lock: a concurrent transition on the
        // same record loses here, not at the caller's earlier read.
        if record.status() != expected {
            return Err(StorageError::StatusConflict {
                actual: record.status(),
            });
        }

        record.set_status(next, std::time::SystemTime::now());
        Ok(record.clone())
    }
}
