pub mod error;
pub mod telemetry;
pub mod transfers;

// Re-export commonly used types
pub use error::{ErrorClass, TransferError};
pub use telemetry::{NoopSink, TelemetrySink, TracingSink};
pub use transfers::TransferEngine;
