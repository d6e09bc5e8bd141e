//! Tracing and logging setup shared by the ledger binaries.

/// Initialize process-wide tracing from the environment.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    let (config, rejected) = tracing::TracingConfig::from_env();
    tracing::init(config);

    if let Some(err) = rejected {
        ::tracing::warn!(error = %err, "falling back to json logs");
    }
}

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use crate::tracing::{LogFormat, TracingConfig, UnknownLogFormat};
