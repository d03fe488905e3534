use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use remit::prelude::*;

const CPF_A: &str = "12345678909";
const CPF_B: &str = "52998224725";
const CPF_C: &str = "11144477735";

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn cpf(s: &str) -> Cpf {
    s.parse().unwrap()
}

fn amount(s: &str) -> Centavos {
    Centavos::from_decimal_str(s).unwrap()
}

fn seeded_accounts(balances: &[(u64, &str, &str)]) -> MemoryAccounts<Centavos> {
    let accounts = MemoryAccounts::new();
    for &(id, cpf_str, balance) in balances {
        accounts
            .seed(Account::new(id, cpf(cpf_str), amount(balance)).unwrap())
            .unwrap();
    }
    accounts
}

#[tokio::test]
async fn scenario_basic_transfer() {
    init_tracing();
    let accounts = seeded_accounts(&[(1, CPF_A, "200.00"), (2, CPF_B, "100.00")]);
    let engine = TransferEngine::new(accounts, MemoryTransferLog::new());

    let tx = engine
        .create_transfer(&cpf(CPF_A), &cpf(CPF_B), amount("100.00"), TransferKind::Transfer)
        .await
        .unwrap();

    assert_eq!(tx.status(), TransferStatus::Completed);
    assert_eq!(engine.accounts().get(1).unwrap().balance(), amount("100.00"));
    assert_eq!(engine.accounts().get(2).unwrap().balance(), amount("200.00"));
}

#[tokio::test]
async fn scenario_insufficient_funds_changes_nothing() {
    let accounts = seeded_accounts(&[(1, CPF_A, "50.00"), (2, CPF_B, "100.00")]);
    let engine = TransferEngine::new(accounts, MemoryTransferLog::new());

    let result = engine
        .create_transfer(&cpf(CPF_A), &cpf(CPF_B), amount("100.00"), TransferKind::Transfer)
        .await;

    assert_eq!(
        result.unwrap_err(),
        TransferError::InsufficientFunds { cpf: cpf(CPF_A) }
    );
    assert!(engine.log().is_empty());
    assert_eq!(engine.accounts().get(1).unwrap().balance(), amount("50.00"));
    assert_eq!(engine.accounts().get(2).unwrap().balance(), amount("100.00"));
}

#[tokio::test]
async fn scenario_unknown_sender_creates_no_record() {
    let accounts = seeded_accounts(&[(2, CPF_B, "100.00")]);
    let engine = TransferEngine::new(accounts, MemoryTransferLog::new());

    let result = engine
        .create_transfer(&cpf(CPF_A), &cpf(CPF_B), amount("10.00"), TransferKind::Transfer)
        .await;

    assert_eq!(result.unwrap_err(), TransferError::SenderNotFound(cpf(CPF_A)));
    assert!(engine.log().is_empty());
}

#[tokio::test]
async fn scenario_revert_of_unfinished_record_is_invalid() {
    let accounts = seeded_accounts(&[(1, CPF_A, "100.00"), (2, CPF_B, "0.00")]);
    let engine = TransferEngine::new(accounts, MemoryTransferLog::new());

    let tx = engine
        .log()
        .insert(cpf(CPF_A), cpf(CPF_B), amount("10.00"), TransferKind::Transfer)
        .await
        .unwrap();

    let result = engine.revert_transfer(tx.id()).await;
    assert_eq!(
        result.unwrap_err(),
        TransferError::NotRevertable {
            id: tx.id(),
            status: TransferStatus::Created
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn scenario_concurrent_transfers_never_overdraw() {
    init_tracing();
    let accounts = seeded_accounts(&[(1, CPF_A, "100.00"), (2, CPF_B, "0.00")]);
    let engine = Arc::new(TransferEngine::new(accounts, MemoryTransferLog::new()));

    // 10 concurrent 50.00 transfers against a 100.00 balance: exactly two
    // can win
    let handles: Vec<_> = (0..10)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                engine
                    .create_transfer(&cpf(CPF_A), &cpf(CPF_B), amount("50.00"), TransferKind::Transfer)
                    .await
            })
        })
        .collect();

    let mut completed = 0;
    let mut insufficient = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(tx) => {
                assert_eq!(tx.status(), TransferStatus::Completed);
                completed += 1;
            }
            Err(TransferError::InsufficientFunds { cpf: c }) => {
                assert_eq!(c, cpf(CPF_A));
                insufficient += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(completed, 2);
    assert_eq!(insufficient, 8);
    assert_eq!(engine.accounts().get(1).unwrap().balance(), amount("0.00"));
    assert_eq!(engine.accounts().get(2).unwrap().balance(), amount("100.00"));
}

#[tokio::test]
async fn revert_is_a_true_inverse() {
    let accounts = seeded_accounts(&[(1, CPF_A, "321.45"), (2, CPF_B, "78.55")]);
    let engine = TransferEngine::new(accounts, MemoryTransferLog::new());

    let tx = engine
        .create_transfer(&cpf(CPF_A), &cpf(CPF_B), amount("100.00"), TransferKind::Transfer)
        .await
        .unwrap();
    engine.revert_transfer(tx.id()).await.unwrap();

    assert_eq!(engine.accounts().get(1).unwrap().balance(), amount("321.45"));
    assert_eq!(engine.accounts().get(2).unwrap().balance(), amount("78.55"));
}

#[tokio::test]
async fn revert_succeeds_once_and_only_once() {
    let accounts = seeded_accounts(&[(1, CPF_A, "100.00"), (2, CPF_B, "0.00")]);
    let engine = TransferEngine::new(accounts, MemoryTransferLog::new());

    let tx = engine
        .create_transfer(&cpf(CPF_A), &cpf(CPF_B), amount("30.00"), TransferKind::Transfer)
        .await
        .unwrap();

    assert!(engine.revert_transfer(tx.id()).await.is_ok());
    assert!(matches!(
        engine.revert_transfer(tx.id()).await,
        Err(TransferError::NotRevertable {
            status: TransferStatus::Reverted,
            ..
        })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reverts_apply_the_inverse_exactly_once() {
    let accounts = seeded_accounts(&[(1, CPF_A, "100.00"), (2, CPF_B, "0.00")]);
    let engine = Arc::new(TransferEngine::new(accounts, MemoryTransferLog::new()));

    let tx = engine
        .create_transfer(&cpf(CPF_A), &cpf(CPF_B), amount("40.00"), TransferKind::Transfer)
        .await
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let id = tx.id();
            tokio::spawn(async move { engine.revert_transfer(id).await.is_ok() })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.unwrap() {
            succeeded += 1;
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(engine.accounts().get(1).unwrap().balance(), amount("100.00"));
    assert_eq!(engine.accounts().get(2).unwrap().balance(), amount("0.00"));
}

#[tokio::test]
async fn conservation_across_a_sequence_of_transfers() {
    let accounts = seeded_accounts(&[
        (1, CPF_A, "300.00"),
        (2, CPF_B, "200.00"),
        (3, CPF_C, "100.00"),
    ]);
    let engine = TransferEngine::new(accounts, MemoryTransferLog::new());
    let initial = engine.accounts().total_balance().unwrap();

    for (from, to, value) in [
        (CPF_A, CPF_B, "120.00"),
        (CPF_B, CPF_C, "310.00"),
        (CPF_C, CPF_A, "55.50"),
        (CPF_A, CPF_C, "0.01"),
    ] {
        engine
            .create_transfer(&cpf(from), &cpf(to), amount(value), TransferKind::Transfer)
            .await
            .unwrap();
        assert_eq!(engine.accounts().total_balance().unwrap(), initial);
    }

    // Unwind in reverse order so every receiver still holds the funds
    for id in (1..=4).rev() {
        engine.revert_transfer(id).await.unwrap();
        assert_eq!(engine.accounts().total_balance().unwrap(), initial);
    }

    // Fully unwound: every account is back at its seeded balance
    assert_eq!(engine.accounts().get(1).unwrap().balance(), amount("300.00"));
    assert_eq!(engine.accounts().get(2).unwrap().balance(), amount("200.00"));
    assert_eq!(engine.accounts().get(3).unwrap().balance(), amount("100.00"));
}

/// Sink recording event names, for asserting the telemetry contract
#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<String>>,
}

impl RecordingSink {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }
}

impl TelemetrySink for RecordingSink {
    fn transfer_attempted(&self, _sender: &Cpf, _receiver: &Cpf, _amount: &str) {
        self.push("transfer_attempted");
    }

    fn transfer_completed(&self, _id: u64, _sender: &Cpf, _receiver: &Cpf) {
        self.push("transfer_completed");
    }

    fn transfer_failed(&self, _sender: &Cpf, _receiver: &Cpf, reason: &str) {
        self.push(format!("transfer_failed: {reason}"));
    }

    fn revert_attempted(&self, _id: u64) {
        self.push("revert_attempted");
    }

    fn revert_completed(&self, _id: u64) {
        self.push("revert_completed");
    }

    fn revert_failed(&self, _id: u64, reason: &str) {
        self.push(format!("revert_failed: {reason}"));
    }
}

#[tokio::test]
async fn telemetry_sees_every_outcome() {
    let sink = Arc::new(RecordingSink::default());
    let accounts = seeded_accounts(&[(1, CPF_A, "100.00"), (2, CPF_B, "0.00")]);
    let engine = TransferEngine::with_telemetry(accounts, MemoryTransferLog::new(), Arc::clone(&sink));

    let tx = engine
        .create_transfer(&cpf(CPF_A), &cpf(CPF_B), amount("60.00"), TransferKind::Transfer)
        .await
        .unwrap();
    engine
        .create_transfer(&cpf(CPF_A), &cpf(CPF_B), amount("60.00"), TransferKind::Transfer)
        .await
        .unwrap_err();
    engine.revert_transfer(tx.id()).await.unwrap();
    engine.revert_transfer(tx.id()).await.unwrap_err();

    let events = sink.events();
    assert_eq!(events[0], "transfer_attempted");
    assert_eq!(events[1], "transfer_completed");
    assert_eq!(events[2], "transfer_attempted");
    assert!(events[3].starts_with("transfer_failed: insufficient funds"));
    assert_eq!(events[4], "revert_attempted");
    assert_eq!(events[5], "revert_completed");
    assert_eq!(events[6], "revert_attempted");
    assert!(events[7].starts_with("revert_failed:"));
    assert_eq!(events.len(), 8);
}

/// Account store that starts failing on command, for exercising the
/// mid-protocol storage failure path
struct FlakyAccounts {
    inner: MemoryAccounts<Centavos>,
    fail_for: Mutex<Option<u64>>,
}

impl FlakyAccounts {
    fn new(inner: MemoryAccounts<Centavos>) -> Self {
        Self {
            inner,
            fail_for: Mutex::new(None),
        }
    }

    fn fail_adjust_for(&self, id: u64) {
        *self.fail_for.lock().unwrap() = Some(id);
    }
}

#[async_trait]
impl AccountStore<Centavos> for FlakyAccounts {
    async fn find_by_cpf(&self, cpf: &Cpf) -> Result<Option<Account<Centavos>>, StorageError> {
        self.inner.find_by_cpf(cpf).await
    }

    async fn adjust_balance(&self, id: u64, delta: Centavos) -> Result<Account<Centavos>, StorageError> {
        if *self.fail_for.lock().unwrap() == Some(id) {
            return Err(StorageError::Unavailable("injected failure".to_string()));
        }
        self.inner.adjust_balance(id, delta).await
    }
}

#[tokio::test]
async fn credit_failure_marks_the_record_errored_without_undoing_the_debit() {
    init_tracing();
    let inner = seeded_accounts(&[(1, CPF_A, "100.00"), (2, CPF_B, "0.00")]);
    let accounts = Arc::new(FlakyAccounts::new(inner));
    let log = Arc::new(MemoryTransferLog::new());
    let engine = TransferEngine::new(Arc::clone(&accounts), Arc::clone(&log));

    // The receiver's credit will fail mid-protocol
    accounts.fail_adjust_for(2);

    let result = engine
        .create_transfer(&cpf(CPF_A), &cpf(CPF_B), amount("30.00"), TransferKind::Transfer)
        .await;

    assert!(matches!(
        result,
        Err(TransferError::Storage(StorageError::Unavailable(_)))
    ));

    // The record is terminal in `error`; the sender's debit stands for
    // manual reconciliation
    let stored = log.get(1).await.unwrap().unwrap();
    assert_eq!(stored.status(), TransferStatus::Error);
    assert!(stored.status().is_terminal());
    assert_eq!(accounts.inner.get(1).unwrap().balance(), amount("70.00"));
    assert_eq!(accounts.inner.get(2).unwrap().balance(), amount("0.00"));

    // Errored records are not revertable
    assert!(matches!(
        engine.revert_transfer(1).await,
        Err(TransferError::NotRevertable {
            status: TransferStatus::Error,
            ..
        })
    ));
}

#[tokio::test]
async fn debit_failure_marks_the_record_errored_with_no_money_moved() {
    let inner = seeded_accounts(&[(1, CPF_A, "100.00"), (2, CPF_B, "0.00")]);
    let accounts = Arc::new(FlakyAccounts::new(inner));
    let log = Arc::new(MemoryTransferLog::new());
    let engine = TransferEngine::new(Arc::clone(&accounts), Arc::clone(&log));

    accounts.fail_adjust_for(1);

    let result = engine
        .create_transfer(&cpf(CPF_A), &cpf(CPF_B), amount("30.00"), TransferKind::Transfer)
        .await;

    assert!(matches!(
        result,
        Err(TransferError::Storage(StorageError::Unavailable(_)))
    ));
    assert_eq!(log.get(1).await.unwrap().unwrap().status(), TransferStatus::Error);
    assert_eq!(accounts.inner.get(1).unwrap().balance(), amount("100.00"));
    assert_eq!(accounts.inner.get(2).unwrap().balance(), amount("0.00"));
}

#[tokio::test]
async fn gateway_error_classes_line_up() {
    let accounts = seeded_accounts(&[(1, CPF_A, "10.00"), (2, CPF_B, "0.00")]);
    let engine = TransferEngine::new(accounts, MemoryTransferLog::new());

    let insufficient = engine
        .create_transfer(&cpf(CPF_A), &cpf(CPF_B), amount("20.00"), TransferKind::Transfer)
        .await
        .unwrap_err();
    assert_eq!(insufficient.class(), ErrorClass::InvalidRequest);

    let missing = engine.revert_transfer(99).await.unwrap_err();
    assert_eq!(missing.class(), ErrorClass::NotFound);
}
