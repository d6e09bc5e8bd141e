use rust_decimal::Decimal;
use serde::Deserialize;

use ledger_core::{AccountId, DomainError, DomainResult, Entity, FieldErrors, Owned, UserId};

use crate::filter::Orderable;
use crate::validate::{required_text, Draft, INVALID_STRING};

pub const ACCOUNT_NUMBER_MAX: usize = 20;
pub const ACCOUNT_NAME_MAX: usize = 100;

/// A user-owned ledger account.
///
/// The balance is not stored here: it is derived from the account's
/// transactions at read time (see [`AccountSummary`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    /// Fixed at creation; there is no transfer operation.
    pub owner: UserId,
    pub account_number: String,
    pub account_name: String,
}

impl Account {
    /// Replace the mutable fields (full replacement).
    pub fn apply(&mut self, fields: AccountFields) {
        self.account_number = fields.account_number;
        self.account_name = fields.account_name;
    }
}

impl Entity for Account {
    type Id = AccountId;

    fn id(&self) -> &AccountId {
        &self.id
    }
}

impl Owned for Account {
    fn owner(&self) -> UserId {
        self.owner
    }

    fn not_found() -> DomainError {
        DomainError::AccountNotFound
    }
}

impl Orderable for Account {
    const ORDER_FIELDS: &'static [&'static str] = &["id", "account_number", "account_name"];
}

/// An account together with its balance at read time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSummary {
    pub account: Account,
    pub balance: Decimal,
}

/// Validated values for creating or replacing an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountFields {
    pub account_number: String,
    pub account_name: String,
}

impl AccountFields {
    pub fn new(account_number: impl Into<String>, account_name: impl Into<String>) -> DomainResult<Self> {
        AccountDraft {
            account_number: Some(account_number.into()),
            account_name: Some(account_name.into()),
        }
        .into_fields()
    }
}

/// Unvalidated account input as it arrives from a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AccountDraft {
    pub account_number: Option<String>,
    pub account_name: Option<String>,
}

impl Draft for AccountDraft {
    fn invalid_value(_field: &str) -> &'static str {
        INVALID_STRING
    }
}

impl AccountDraft {
    /// Both fields are required on create and on update.
    pub fn into_fields(self) -> DomainResult<AccountFields> {
        let mut errors = FieldErrors::new();
        let account_number = required_text(
            &mut errors,
            "account_number",
            self.account_number,
            ACCOUNT_NUMBER_MAX,
        );
        let account_name = required_text(
            &mut errors,
            "account_name",
            self.account_name,
            ACCOUNT_NAME_MAX,
        );

        match (account_number, account_name) {
            (Some(account_number), Some(account_name)) if errors.is_empty() => Ok(AccountFields {
                account_number,
                account_name,
            }),
            _ => Err(DomainError::Validation(errors)),
        }
    }
}
