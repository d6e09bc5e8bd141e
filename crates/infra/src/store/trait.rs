use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use ledger_accounting::{
    Account, AccountFields, AccountSummary, ListQuery, NewTransaction, OwnedTransaction, Page,
    PageRequest, Transaction,
};
use ledger_core::{AccountId, TransactionId, UserId};

/// Ledger persistence error.
///
/// These are **infrastructure errors** (connectivity, constraints, corrupt
/// rows) as opposed to domain errors (validation, ownership, not found).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend rejected a write because a constraint was violated.
    #[error("constraint violated in {operation}: {message}")]
    Constraint {
        operation: &'static str,
        message: String,
    },

    /// The backend could not be reached (closed pool, timed out, IO).
    #[error("store unavailable in {operation}: {message}")]
    Unavailable {
        operation: &'static str,
        message: String,
    },

    /// A stored row could not be turned back into a domain value.
    #[error("malformed row in {operation}: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },

    #[error("store error in {operation}: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },
}

/// Read side of the ledger store.
///
/// Reads are not guarded; callers are expected to scope them (accounts by
/// owner, transactions by an already-authorized account). Every write goes
/// through a [`LedgerUnit`] obtained from [`LedgerStore::begin`].
#[async_trait]
pub trait LedgerStore: Send + Sync {
    type Unit: LedgerUnit;

    /// Open a unit of work. Nothing it writes is visible until `commit`.
    async fn begin(&self) -> Result<Self::Unit, StoreError>;

    async fn account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Σ credit − Σ debit over the account's transactions; zero when it has none.
    async fn account_balance(&self, id: AccountId) -> Result<Decimal, StoreError>;

    /// One page of `owner`'s accounts, each with its balance.
    async fn list_accounts(
        &self,
        owner: UserId,
        query: &ListQuery,
        page: PageRequest,
    ) -> Result<Page<AccountSummary>, StoreError>;

    async fn list_transactions(
        &self,
        account_id: AccountId,
        query: &ListQuery,
        page: PageRequest,
    ) -> Result<Page<Transaction>, StoreError>;
}

/// A unit of work over the ledger.
///
/// Lookups made through a unit see its own pending writes and hold the rows
/// they return until the unit ends, so a guard check and the write that
/// follows it cannot interleave with another unit touching the same rows.
/// Dropping a unit without calling [`LedgerUnit::commit`] discards its writes.
#[async_trait]
pub trait LedgerUnit: Send {
    async fn account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// The transaction `id` under `account_id`, together with the account owner.
    async fn transaction(
        &mut self,
        account_id: AccountId,
        id: TransactionId,
    ) -> Result<Option<OwnedTransaction>, StoreError>;

    async fn insert_account(
        &mut self,
        owner: UserId,
        fields: AccountFields,
    ) -> Result<Account, StoreError>;

    async fn update_account(&mut self, account: &Account) -> Result<(), StoreError>;

    /// Remove an account and every transaction under it. Returns how many
    /// transactions went with it.
    async fn delete_account(&mut self, id: AccountId) -> Result<u64, StoreError>;

    async fn insert_transaction(&mut self, new: NewTransaction) -> Result<Transaction, StoreError>;

    async fn update_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError>;

    async fn delete_transaction(&mut self, id: TransactionId) -> Result<(), StoreError>;

    async fn commit(self) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore,
{
    type Unit = S::Unit;

    async fn begin(&self) -> Result<Self::Unit, StoreError> {
        (**self).begin().await
    }

    async fn account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        (**self).account(id).await
    }

    async fn account_balance(&self, id: AccountId) -> Result<Decimal, StoreError> {
        (**self).account_balance(id).await
    }

    async fn list_accounts(
        &self,
        owner: UserId,
        query: &ListQuery,
        page: PageRequest,
    ) -> Result<Page<AccountSummary>, StoreError> {
        (**self).list_accounts(owner, query, page).await
    }

    async fn list_transactions(
        &self,
        account_id: AccountId,
        query: &ListQuery,
        page: PageRequest,
    ) -> Result<Page<Transaction>, StoreError> {
        (**self).list_transactions(account_id, query, page).await
    }
}
