//! Personal ledger domain: accounts, debit/credit transactions, balances.
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns.

pub mod account;
pub mod amount;
pub mod filter;
pub mod transaction;
mod validate;

pub use account::{Account, AccountDraft, AccountFields, AccountSummary};
pub use amount::{balance_of, Amount};
pub use filter::{
    ListFilters, ListQuery, OrderBy, Orderable, Page, PageRequest, SortDirection,
};
pub use transaction::{
    parse_datetime, NewTransaction, OwnedTransaction, Transaction, TransactionDraft,
    TransactionFields,
};
pub use validate::{Draft, INVALID_DATETIME, INVALID_NUMBER, INVALID_STRING};
