//! `ledger-core`: foundation building blocks shared by every ledger crate.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;

pub use entity::{Entity, Owned};
pub use error::{AmountRule, DomainError, DomainResult, ErrorKind, FieldErrors, NON_FIELD_ERRORS};
pub use id::{AccountId, TransactionId, UserId};
