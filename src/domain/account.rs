use serde::{Deserialize, Serialize};

use super::amount::Amount;
use super::cpf::Cpf;
use super::error::DomainError;

/// Balance-holding account with private fields enforcing invariants
///
/// The engine never creates or deletes accounts; that is the Account
/// Directory's job. It only reads them and adjusts balances through the
/// store's conditional-adjust primitive, which keeps `balance >= 0`
/// observable between operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account<A: Amount> {
    id: u64,
    cpf: Cpf,
    balance: A,
}

impl<A: Amount> Account<A> {
    /// Create an account with a non-negative starting balance
    pub fn new(id: u64, cpf: Cpf, balance: A) -> Result<Self, DomainError> {
        if balance < A::zero() {
            return Err(DomainError::InvalidAmount);
        }
        Ok(Self { id, cpf, balance })
    }

    /// Opaque internal identifier, immutable after creation
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The natural key the engine resolves accounts by
    pub fn cpf(&self) -> &Cpf {
        &self.cpf
    }

    /// Current balance
    pub fn balance(&self) -> A {
        self.balance
    }

    // Mutation is reserved for the storage layer's atomic adjust
    pub(crate) fn set_balance(&mut self, balance: A) {
        self.balance = balance;
    }
}
