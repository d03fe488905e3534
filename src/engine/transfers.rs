use std::marker::PhantomData;

use tracing::{debug, error};

use super::error::TransferError;
use super::telemetry::{TelemetrySink, TracingSink};
use crate::domain::{Amount, Cpf, DomainError, Transfer, TransferKind, TransferStatus};
use crate::storage::{AccountStore, StorageError, TransferLog};

/// Orchestrates the create/revert transfer protocol over an account store
/// and a transfer log
///
/// All mutation of account balances goes through the store's atomic
/// conditional adjust; the engine never does its own read-modify-write.
/// Methods take `&self` so one engine can serve concurrent request handlers
/// through an `Arc`.
pub struct TransferEngine<A, S, L, T = TracingSink>
where
    A: Amount,
    S: AccountStore<A>,
    L: TransferLog<A>,
    T: TelemetrySink,
{
    accounts: S,
    log: L,
    telemetry: T,
    _amount: PhantomData<A>,
}

impl<A, S, L> TransferEngine<A, S, L>
where
    A: Amount,
    S: AccountStore<A>,
    L: TransferLog<A>,
{
    /// Create an engine that reports events through `tracing`
    pub fn new(accounts: S, log: L) -> Self {
        Self::with_telemetry(accounts, log, TracingSink)
    }
}

impl<A, S, L, T> TransferEngine<A, S, L, T>
where
    A: Amount,
    S: AccountStore<A>,
    L: TransferLog<A>,
    T: TelemetrySink,
{
    /// Create an engine with an injected telemetry sink
    pub fn with_telemetry(accounts: S, log: L, telemetry: T) -> Self {
        Self {
            accounts,
            log,
            telemetry,
            _amount: PhantomData,
        }
    }

    /// The underlying account store
    pub fn accounts(&self) -> &S {
        &self.accounts
    }

    /// The underlying transfer log
    pub fn log(&self) -> &L {
        &self.log
    }

    /// Move `amount` from the sender's account to the receiver's
    ///
    /// Validation order: positive amount, sender resolves, receiver
    /// resolves, sufficient balance. No record is persisted when a
    /// precondition fails. Once the record reaches `processing`, any failure
    /// moves it to `error` and surfaces the underlying cause unmodified; a
    /// partial debit is not undone automatically and must be reconciled
    /// out-of-band.
    pub async fn create_transfer(
        &self,
        sender: &Cpf,
        receiver: &Cpf,
        amount: A,
        kind: TransferKind,
    ) -> Result<Transfer<A>, TransferError> {
        self.telemetry
            .transfer_attempted(sender, receiver, &amount.to_decimal_string());

        let result = self.run_create(sender, receiver, amount, kind).await;
        match &result {
            Ok(tx) => self.telemetry.transfer_completed(tx.id(), sender, receiver),
            Err(err) => self
                .telemetry
                .transfer_failed(sender, receiver, &err.to_string()),
        }
        result
    }

    async fn run_create(
        &self,
        sender: &Cpf,
        receiver: &Cpf,
        amount: A,
        kind: TransferKind,
    ) -> Result<Transfer<A>, TransferError> {
        if !amount.is_positive() {
            return Err(TransferError::InvalidAmount);
        }

        let sender_account = self
            .accounts
            .find_by_cpf(sender)
            .await?
            .ok_or_else(|| TransferError::SenderNotFound(sender.clone()))?;
        let receiver_account = self
            .accounts
            .find_by_cpf(receiver)
            .await?
            .ok_or_else(|| TransferError::ReceiverNotFound(receiver.clone()))?;

        // Fast-path rejection; sufficiency is re-validated atomically at
        // debit time since a concurrent debit may intervene
        if sender_account.balance() < amount {
            return Err(TransferError::InsufficientFunds {
                cpf: sender.clone(),
            });
        }

        let tx = self
            .log
            .insert(sender.clone(), receiver.clone(), amount, kind)
            .await?;
        let tx = self
            .log
            .transition(tx.id(), TransferStatus::Created, TransferStatus::Processing)
            .await?;
        debug!(transfer_id = tx.id(), %sender, %receiver, "transfer processing");

        if let Err(err) = self
            .accounts
            .adjust_balance(sender_account.id(), A::zero() - amount)
            .await
        {
            let cause = match err {
                StorageError::Domain(DomainError::InsufficientFunds) => {
                    TransferError::InsufficientFunds {
                        cpf: sender.clone(),
                    }
                }
                StorageError::NotFound => TransferError::SenderNotFound(sender.clone()),
                other => other.into(),
            };
            return Err(self.mark_errored(tx.id(), cause).await);
        }

        // A credit failure here leaves the sender debited; the record goes
        // to `error` for manual reconciliation rather than being undone
        if let Err(err) = self
            .accounts
            .adjust_balance(receiver_account.id(), amount)
            .await
        {
            let cause = match err {
                StorageError::NotFound => TransferError::ReceiverNotFound(receiver.clone()),
                other => other.into(),
            };
            return Err(self.mark_errored(tx.id(), cause).await);
        }

        match self
            .log
            .transition(tx.id(), TransferStatus::Processing, TransferStatus::Completed)
            .await
        {
            Ok(tx) => Ok(tx),
            Err(err) => Err(self.mark_errored(tx.id(), err.into()).await),
        }
    }

    /// Apply the exact inverse of a completed transfer and mark it reverted
    ///
    /// No new record is created. A revert of anything but a `completed`
    /// record fails with `NotRevertable`; a revert that would drive the
    /// original receiver below zero fails with `InsufficientFunds` and
    /// leaves the record `completed`, with no partial reversal.
    pub async fn revert_transfer(&self, id: u64) -> Result<Transfer<A>, TransferError> {
        self.telemetry.revert_attempted(id);

        let result = self.run_revert(id).await;
        match &result {
            Ok(tx) => self.telemetry.revert_completed(tx.id()),
            Err(err) => self.telemetry.revert_failed(id, &err.to_string()),
        }
        result
    }

    async fn run_revert(&self, id: u64) -> Result<Transfer<A>, TransferError> {
        let tx = self
            .log
            .get(id)
            .await?
            .ok_or(TransferError::TransferNotFound(id))?;
        if !tx.is_revertable() {
            return Err(TransferError::NotRevertable {
                id,
                status: tx.status(),
            });
        }

        let sender_account = self
            .accounts
            .find_by_cpf(tx.sender_cpf())
            .await?
            .ok_or_else(|| TransferError::SenderNotFound(tx.sender_cpf().clone()))?;
        let receiver_account = self
            .accounts
            .find_by_cpf(tx.receiver_cpf())
            .await?
            .ok_or_else(|| TransferError::ReceiverNotFound(tx.receiver_cpf().clone()))?;

        // Claim the record before touching balances: the compare-and-set on
        // `completed` serializes concurrent reverts of the same transfer,
        // re-verified inside the log's write lock
        let claimed = match self
            .log
            .transition(id, TransferStatus::Completed, TransferStatus::Reverted)
            .await
        {
            Ok(tx) => tx,
            Err(StorageError::StatusConflict { actual }) => {
                return Err(TransferError::NotRevertable { id, status: actual });
            }
            Err(other) => return Err(other.into()),
        };

        let amount = claimed.amount();

        // A self-transfer nets to zero either way, so the claim alone
        // completes the revert regardless of the current balance
        if sender_account.id() == receiver_account.id() {
            return Ok(claimed);
        }

        // Inverse debit on the original receiver; on failure release the
        // claim so the record remains `completed` and nothing was adjusted
        if let Err(err) = self
            .accounts
            .adjust_balance(receiver_account.id(), A::zero() - amount)
            .await
        {
            let cause = match err {
                StorageError::Domain(DomainError::InsufficientFunds) => {
                    TransferError::InsufficientFunds {
                        cpf: receiver_account.cpf().clone(),
                    }
                }
                StorageError::NotFound => {
                    TransferError::ReceiverNotFound(receiver_account.cpf().clone())
                }
                other => other.into(),
            };
            self.restore_completed(id).await;
            return Err(cause);
        }

        // Inverse credit on the original sender; on failure put the
        // receiver's funds back so no partial reversal persists
        if let Err(err) = self
            .accounts
            .adjust_balance(sender_account.id(), amount)
            .await
        {
            if let Err(undo_err) = self
                .accounts
                .adjust_balance(receiver_account.id(), amount)
                .await
            {
                error!(
                    transfer_id = id,
                    error = %undo_err,
                    "failed to return funds to receiver after aborted revert"
                );
            }
            self.restore_completed(id).await;
            let cause = match err {
                StorageError::NotFound => {
                    TransferError::SenderNotFound(sender_account.cpf().clone())
                }
                other => other.into(),
            };
            return Err(cause);
        }

        Ok(claimed)
    }

    /// Exactly one best-effort attempt to move a processing record to
    /// `error`; if it fails the record stays `processing` for out-of-band
    /// reconciliation and the original cause is surfaced unmodified
    async fn mark_errored(&self, id: u64, cause: TransferError) -> TransferError {
        if let Err(mark_err) = self
            .log
            .transition(id, TransferStatus::Processing, TransferStatus::Error)
            .await
        {
            error!(transfer_id = id, error = %mark_err, "could not mark transfer as errored");
        }
        cause
    }

    async fn restore_completed(&self, id: u64) {
        if let Err(err) = self
            .log
            .transition(id, TransferStatus::Reverted, TransferStatus::Completed)
            .await
        {
            error!(transfer_id = id, error = %err, "could not release revert claim");
        }
    }
}
