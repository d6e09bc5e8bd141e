//! Infrastructure layer: ledger persistence plus the query and command
//! surfaces built on top of it.

pub mod selectors;
pub mod services;
pub mod store;

pub use services::{LedgerService, ServiceError};
pub use store::{InMemoryLedgerStore, LedgerStore, LedgerUnit, PostgresLedgerStore, StoreError};
