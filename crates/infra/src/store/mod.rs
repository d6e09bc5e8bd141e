//! Ledger persistence boundary.
//!
//! Reads go straight through [`LedgerStore`]; every write happens inside a
//! [`LedgerUnit`] so that the ownership guard and the write it protects see
//! the same rows.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::{InMemoryLedgerStore, InMemoryLedgerUnit};
pub use postgres::{PostgresLedgerStore, PostgresLedgerUnit};
pub use r#trait::{LedgerStore, LedgerUnit, StoreError};
