//! Strongly-typed identifiers used across the ledger.
//!
//! All identifiers are relational serial keys (`BIGSERIAL` in Postgres).

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, FieldErrors};

/// Identifier of a user (actor identity, owned by the authentication layer).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

/// Identifier of a ledger account.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(i64);

/// Identifier of a transaction posted to an account.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(i64);

macro_rules! impl_serial_newtype {
    ($t:ty, $field:literal) => {
        impl $t {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self).map_err(|_| {
                    DomainError::Validation(FieldErrors::single($field, "A valid integer is required."))
                })
            }
        }
    };
}

impl_serial_newtype!(UserId, "user_id");
impl_serial_newtype!(AccountId, "account_id");
impl_serial_newtype!(TransactionId, "transaction_id");
