use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::amount::Amount;
use super::cpf::Cpf;
use super::error::DomainError;

/// Kind of a transfer attempt
///
/// The engine treats both kinds identically: a deposit still resolves and
/// debits a sender. Whether a deposit should instead be sourceless is an
/// open business question upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferKind {
    Deposit,
    Transfer,
}

impl FromStr for TransferKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(Self::Deposit),
            "transfer" => Ok(Self::Transfer),
            other => Err(DomainError::InvalidKind(other.to_string())),
        }
    }
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Deposit => "deposit",
            Self::Transfer => "transfer",
        })
    }
}

/// Status of a transfer attempt
///
/// ```text
/// created -> processing -> completed -> reverted
///                       -> error
/// ```
/// `error` and `reverted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Created,
    Processing,
    Completed,
    Error,
    Reverted,
}

impl TransferStatus {
    /// Whether the state machine permits moving from `self` to `next`
    pub fn can_transition_to(&self, next: TransferStatus) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Error)
                | (Self::Completed, Self::Reverted)
        )
    }

    /// Terminal states have no outgoing transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error | Self::Reverted)
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Reverted => "reverted",
        })
    }
}

/// Persisted record of one transfer attempt
///
/// The sender and receiver CPFs are copies taken at attempt time, not live
/// references; a later identifier change on an account must not rewrite
/// history. Records are never deleted: reversal is a status, not a new row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer<A: Amount> {
    id: u64,
    sender_cpf: Cpf,
    receiver_cpf: Cpf,
    amount: A,
    kind: TransferKind,
    status: TransferStatus,
    created_at: SystemTime,
    updated_at: SystemTime,
}

impl<A: Amount> Transfer<A> {
    /// Create a new record in the initial `created` state
    pub fn new(id: u64, sender_cpf: Cpf, receiver_cpf: Cpf, amount: A, kind: TransferKind) -> Self {
        let now = SystemTime::now();
        Self {
            id,
            sender_cpf,
            receiver_cpf,
            amount,
            kind,
            status: TransferStatus::Created,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn sender_cpf(&self) -> &Cpf {
        &self.sender_cpf
    }

    pub fn receiver_cpf(&self) -> &Cpf {
        &self.receiver_cpf
    }

    pub fn amount(&self) -> A {
        self.amount
    }

    pub fn kind(&self) -> TransferKind {
        self.kind
    }

    pub fn status(&self) -> TransferStatus {
        self.status
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Refreshed on every status transition
    pub fn updated_at(&self) -> SystemTime {
        self.updated_at
    }

    /// Only `completed` transfers can be reverted
    pub fn is_revertable(&self) -> bool {
        self.status.can_transition_to(TransferStatus::Reverted)
    }

    // Status writes go through the log's compare-and-set; the engine owns
    // the protocol ordering.
    pub(crate) fn set_status(&mut self, status: TransferStatus, at: SystemTime) {
        self.status = status;
        self.updated_at = at;
    }
}
