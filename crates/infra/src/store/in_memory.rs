use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use ledger_accounting::{
    balance_of, Account, AccountFields, AccountSummary, ListQuery, NewTransaction, OrderBy,
    OwnedTransaction, Page, PageRequest, SortDirection, Transaction,
};
use ledger_core::{AccountId, TransactionId, UserId};

use super::r#trait::{LedgerStore, LedgerUnit, StoreError};

#[derive(Debug, Clone, Default)]
struct Ledger {
    accounts: BTreeMap<AccountId, Account>,
    transactions: BTreeMap<TransactionId, Transaction>,
    last_account_id: i64,
    last_transaction_id: i64,
}

impl Ledger {
    fn balance(&self, account_id: AccountId) -> Decimal {
        balance_of(
            self.transactions
                .values()
                .filter(|t| t.account_id == account_id)
                .map(|t| &t.amount),
        )
    }

    /// Every account's balance in one pass over the transactions.
    fn balances(&self) -> BTreeMap<AccountId, Decimal> {
        let mut balances = BTreeMap::new();
        for transaction in self.transactions.values() {
            *balances.entry(transaction.account_id).or_insert(Decimal::ZERO) +=
                transaction.amount.signed();
        }
        balances
    }

    fn owned_transaction(&self, account_id: AccountId, id: TransactionId) -> Option<OwnedTransaction> {
        let transaction = self.transactions.get(&id).filter(|t| t.account_id == account_id)?;
        let account = self.accounts.get(&account_id)?;
        Some(OwnedTransaction {
            transaction: transaction.clone(),
            owner: account.owner,
        })
    }
}

/// In-memory ledger store.
///
/// Intended for tests/dev. A unit of work holds the whole ledger exclusively
/// and edits a private copy that replaces the shared state on commit, so
/// every write costs a copy of the full ledger and writers are serialised.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    ledger: Arc<Mutex<Ledger>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    type Unit = InMemoryLedgerUnit;

    async fn begin(&self) -> Result<InMemoryLedgerUnit, StoreError> {
        let guard = self.ledger.clone().lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryLedgerUnit { guard, working })
    }

    async fn account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.ledger.lock().await.accounts.get(&id).cloned())
    }

    async fn account_balance(&self, id: AccountId) -> Result<Decimal, StoreError> {
        Ok(self.ledger.lock().await.balance(id))
    }

    async fn list_accounts(
        &self,
        owner: UserId,
        query: &ListQuery,
        page: PageRequest,
    ) -> Result<Page<AccountSummary>, StoreError> {
        let ledger = self.ledger.lock().await;

        let mut accounts: Vec<&Account> = ledger
            .accounts
            .values()
            .filter(|a| a.owner == owner)
            .filter(|a| query.id.is_none_or(|id| a.id.get() == id))
            .collect();
        accounts.sort_by(|a, b| compare_accounts(query.order, a, b));

        let balances = ledger.balances();
        Ok(window(accounts, page).map(|account| AccountSummary {
            balance: balances.get(&account.id).copied().unwrap_or(Decimal::ZERO),
            account: account.clone(),
        }))
    }

    async fn list_transactions(
        &self,
        account_id: AccountId,
        query: &ListQuery,
        page: PageRequest,
    ) -> Result<Page<Transaction>, StoreError> {
        let ledger = self.ledger.lock().await;

        let mut transactions: Vec<&Transaction> = ledger
            .transactions
            .values()
            .filter(|t| t.account_id == account_id)
            .filter(|t| query.id.is_none_or(|id| t.id.get() == id))
            .collect();
        transactions.sort_by(|a, b| compare_transactions(query.order, a, b));

        Ok(window(transactions, page).map(Transaction::clone))
    }
}

/// Exclusive unit of work over an [`InMemoryLedgerStore`].
pub struct InMemoryLedgerUnit {
    guard: OwnedMutexGuard<Ledger>,
    working: Ledger,
}

#[async_trait]
impl LedgerUnit for InMemoryLedgerUnit {
    async fn account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.working.accounts.get(&id).cloned())
    }

    async fn transaction(
        &mut self,
        account_id: AccountId,
        id: TransactionId,
    ) -> Result<Option<OwnedTransaction>, StoreError> {
        Ok(self.working.owned_transaction(account_id, id))
    }

    async fn insert_account(
        &mut self,
        owner: UserId,
        fields: AccountFields,
    ) -> Result<Account, StoreError> {
        self.working.last_account_id += 1;
        let account = Account {
            id: AccountId::new(self.working.last_account_id),
            owner,
            account_number: fields.account_number,
            account_name: fields.account_name,
        };
        self.working.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn update_account(&mut self, account: &Account) -> Result<(), StoreError> {
        match self.working.accounts.get_mut(&account.id) {
            Some(stored) => {
                *stored = account.clone();
                Ok(())
            }
            None => Err(missing_row("update_account", account.id)),
        }
    }

    async fn delete_account(&mut self, id: AccountId) -> Result<u64, StoreError> {
        if self.working.accounts.remove(&id).is_none() {
            return Err(missing_row("delete_account", id));
        }

        let before = self.working.transactions.len();
        self.working.transactions.retain(|_, t| t.account_id != id);
        Ok((before - self.working.transactions.len()) as u64)
    }

    async fn insert_transaction(&mut self, new: NewTransaction) -> Result<Transaction, StoreError> {
        if !self.working.accounts.contains_key(&new.account_id) {
            return Err(StoreError::Constraint {
                operation: "insert_transaction",
                message: format!("account {} does not exist", new.account_id),
            });
        }

        self.working.last_transaction_id += 1;
        let transaction = Transaction {
            id: TransactionId::new(self.working.last_transaction_id),
            account_id: new.account_id,
            amount: new.amount,
            description: new.description,
            verification_number: new.verification_number,
            date: new.date,
        };
        self.working
            .transactions
            .insert(transaction.id, transaction.clone());
        Ok(transaction)
    }

    async fn update_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError> {
        match self.working.transactions.get_mut(&transaction.id) {
            Some(stored) if stored.account_id == transaction.account_id => {
                *stored = transaction.clone();
                Ok(())
            }
            _ => Err(missing_row("update_transaction", transaction.id)),
        }
    }

    async fn delete_transaction(&mut self, id: TransactionId) -> Result<(), StoreError> {
        self.working
            .transactions
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| missing_row("delete_transaction", id))
    }

    async fn commit(self) -> Result<(), StoreError> {
        let Self { mut guard, working } = self;
        *guard = working;
        Ok(())
    }
}

fn missing_row(operation: &'static str, id: impl std::fmt::Display) -> StoreError {
    StoreError::Backend {
        operation,
        message: format!("row {id} not found"),
    }
}

fn window<T>(items: Vec<T>, page: PageRequest) -> Page<T> {
    let count = items.len() as u64;
    let skip = usize::try_from(page.offset).unwrap_or(usize::MAX);
    let items = items
        .into_iter()
        .skip(skip)
        .take(page.limit as usize)
        .collect();
    Page { count, items }
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

// Postgres sorts NULLs after every value in ascending order.
fn nulls_last(a: Option<Decimal>, b: Option<Decimal>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_accounts(order: OrderBy, a: &Account, b: &Account) -> Ordering {
    let by_field = match order.field {
        "account_number" => a.account_number.cmp(&b.account_number),
        "account_name" => a.account_name.cmp(&b.account_name),
        _ => a.id.cmp(&b.id),
    };
    directed(by_field, order.direction).then_with(|| a.id.cmp(&b.id))
}

fn compare_transactions(order: OrderBy, a: &Transaction, b: &Transaction) -> Ordering {
    let by_field = match order.field {
        "debit_amount" => nulls_last(a.amount.debit_amount(), b.amount.debit_amount()),
        "credit_amount" => nulls_last(a.amount.credit_amount(), b.amount.credit_amount()),
        "description" => a.description.cmp(&b.description),
        "verification_number" => a.verification_number.cmp(&b.verification_number),
        "date" => a.date.cmp(&b.date),
        _ => a.id.cmp(&b.id),
    };
    directed(by_field, order.direction).then_with(|| a.id.cmp(&b.id))
}
