use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::Cpf;

/// Sink for the engine's structured events
///
/// The engine emits these as fire-and-forget side effects; delivery cannot
/// fail an operation, so the methods return nothing. The sink holds no
/// mutable engine state.
pub trait TelemetrySink: Send + Sync {
    fn transfer_attempted(&self, sender: &Cpf, receiver: &Cpf, amount: &str);

    fn transfer_completed(&self, id: u64, sender: &Cpf, receiver: &Cpf);

    fn transfer_failed(&self, sender: &Cpf, receiver: &Cpf, reason: &str);

    fn revert_attempted(&self, id: u64);

    fn revert_completed(&self, id: u64);

    fn revert_failed(&self, id: u64, reason: &str);
}

// Shared sinks work like shared stores: observers keep a handle while the
// engine owns its copy.
impl<T: TelemetrySink> TelemetrySink for Arc<T> {
    fn transfer_attempted(&self, sender: &Cpf, receiver: &Cpf, amount: &str) {
        (**self).transfer_attempted(sender, receiver, amount);
    }

    fn transfer_completed(&self, id: u64, sender: &Cpf, receiver: &Cpf) {
        (**self).transfer_completed(id, sender, receiver);
    }

    fn transfer_failed(&self, sender: &Cpf, receiver: &Cpf, reason: &str) {
        (**self).transfer_failed(sender, receiver, reason);
    }

    fn revert_attempted(&self, id: u64) {
        (**self).revert_attempted(id);
    }

    fn revert_completed(&self, id: u64) {
        (**self).revert_completed(id);
    }

    fn revert_failed(&self, id: u64, reason: &str) {
        (**self).revert_failed(id, reason);
    }
}

/// Default sink forwarding events to `tracing`
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn transfer_attempted(&self, sender: &Cpf, receiver: &Cpf, amount: &str) {
        info!(%sender, %receiver, amount, "transfer attempted");
    }

    fn transfer_completed(&self, id: u64, sender: &Cpf, receiver: &Cpf) {
        info!(transfer_id = id, %sender, %receiver, "transfer completed");
    }

    fn transfer_failed(&self, sender: &Cpf, receiver: &Cpf, reason: &str) {
        warn!(%sender, %receiver, reason, "transfer failed");
    }

    fn revert_attempted(&self, id: u64) {
        info!(transfer_id = id, "revert attempted");
    }

    fn revert_completed(&self, id: u64) {
        info!(transfer_id = id, "revert completed");
    }

    fn revert_failed(&self, id: u64, reason: &str) {
        warn!(transfer_id = id, reason, "revert failed");
    }
}

/// Sink that drops every event
pub struct NoopSink;

impl TelemetrySink for NoopSink {
    fn transfer_attempted(&self, _sender: &Cpf, _receiver: &Cpf, _amount: &str) {}

    fn transfer_completed(&self, _id: u64, _sender: &Cpf, _receiver: &Cpf) {}

    fn transfer_failed(&self, _sender: &Cpf, _receiver: &Cpf, _reason: &str) {}

    fn revert_attempted(&self, _id: u64) {}

    fn revert_completed(&self, _id: u64) {}

    fn revert_failed(&self, _id: u64, _reason: &str) {}
}
