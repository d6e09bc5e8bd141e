//! Postgres-backed ledger store.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Constraint` | Duplicate primary key |
//! | Database (foreign key violation) | `23503` | `Constraint` | Transaction inserted under a deleted account |
//! | Database (check constraint violation) | `23514` | `Constraint` | Both or neither amount columns set |
//! | Database (other) | Any other | `Backend` | Other database errors |
//! | PoolClosed / PoolTimedOut / Io | N/A | `Unavailable` | Connection problems |
//! | ColumnDecode / Decode / ColumnNotFound | N/A | `Decode` | Row does not match the schema |
//! | Other | N/A | `Backend` | Anything else |
//!
//! ## Balances
//!
//! Balances are never stored: they are aggregated from `ledger_transactions`
//! with `SUM` on every read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row};
use tracing::instrument;

use ledger_accounting::{
    Account, AccountFields, AccountSummary, Amount, ListQuery, NewTransaction, OwnedTransaction,
    Page, PageRequest, SortDirection, Transaction,
};
use ledger_core::{AccountId, TransactionId, UserId};

use super::r#trait::{LedgerStore, LedgerUnit, StoreError};

/// Tables and constraints backing the ledger.
///
/// `NUMERIC(15, 5)` matches the amount precision accepted at the boundary.
/// The check constraint repeats the one-sided amount rule so that no writer
/// can bypass it.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS ledger_accounts (
    id              BIGSERIAL PRIMARY KEY,
    owner_user_id   BIGINT       NOT NULL,
    account_number  VARCHAR(20)  NOT NULL,
    account_name    VARCHAR(100) NOT NULL
);

CREATE INDEX IF NOT EXISTS ledger_accounts_owner_idx ON ledger_accounts (owner_user_id);

CREATE TABLE IF NOT EXISTS ledger_transactions (
    id                   BIGSERIAL PRIMARY KEY,
    account_id           BIGINT        NOT NULL REFERENCES ledger_accounts (id) ON DELETE CASCADE,
    debit_amount         NUMERIC(15, 5),
    credit_amount        NUMERIC(15, 5),
    description          VARCHAR(100)  NOT NULL,
    verification_number  VARCHAR(20)   NOT NULL,
    date                 TIMESTAMPTZ   NOT NULL DEFAULT NOW(),
    CONSTRAINT ledger_transactions_one_side CHECK (
        (debit_amount IS NOT NULL AND debit_amount > 0 AND credit_amount IS NULL)
        OR (credit_amount IS NOT NULL AND credit_amount > 0 AND debit_amount IS NULL)
    )
);

CREATE INDEX IF NOT EXISTS ledger_transactions_account_idx ON ledger_transactions (account_id);
"#;

const TRANSACTION_COLUMNS: &str =
    "t.id, t.account_id, t.debit_amount, t.credit_amount, t.description, t.verification_number, t.date";

/// Postgres-backed ledger store.
///
/// `PgPool` is internally reference counted, so clones share one pool.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the ledger tables if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    type Unit = PostgresLedgerUnit;

    async fn begin(&self) -> Result<PostgresLedgerUnit, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;
        Ok(PostgresLedgerUnit { tx })
    }

    #[instrument(skip(self), fields(account_id = %id), err)]
    async fn account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_user_id, account_number, account_name
            FROM ledger_accounts
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("account", e))?;

        row.map(|row| decode_account("account", &row)).transpose()
    }

    #[instrument(skip(self), fields(account_id = %id), err)]
    async fn account_balance(&self, id: AccountId) -> Result<Decimal, StoreError> {
        let balance: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(COALESCE(credit_amount, 0) - COALESCE(debit_amount, 0)), 0)
            FROM ledger_transactions
            WHERE account_id = $1
            "#,
        )
        .bind(id.get())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("account_balance", e))?;

        Ok(balance)
    }

    #[instrument(
        skip(self, query),
        fields(
            owner = %owner,
            order_by = query.order.field,
            limit = page.limit,
            offset = page.offset
        ),
        err
    )]
    async fn list_accounts(
        &self,
        owner: UserId,
        query: &ListQuery,
        page: PageRequest,
    ) -> Result<Page<AccountSummary>, StoreError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM ledger_accounts
            WHERE owner_user_id = $1 AND ($2::BIGINT IS NULL OR id = $2)
            "#,
        )
        .bind(owner.get())
        .bind(query.id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_accounts", e))?;

        // `order.field` comes from a fixed whitelist of column names.
        let sql = format!(
            r#"
            SELECT
                a.id,
                a.owner_user_id,
                a.account_number,
                a.account_name,
                COALESCE(SUM(COALESCE(t.credit_amount, 0) - COALESCE(t.debit_amount, 0)), 0) AS balance
            FROM ledger_accounts a
            LEFT JOIN ledger_transactions t ON t.account_id = a.id
            WHERE a.owner_user_id = $1 AND ($2::BIGINT IS NULL OR a.id = $2)
            GROUP BY a.id
            ORDER BY a.{} {}, a.id ASC
            LIMIT $3 OFFSET $4
            "#,
            query.order.field,
            sql_direction(query.order.direction),
        );

        let rows = sqlx::query(&sql)
            .bind(owner.get())
            .bind(query.id)
            .bind(i64::from(page.limit))
            .bind(offset(page))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_accounts", e))?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let balance: Decimal = row
                .try_get("balance")
                .map_err(|e| map_sqlx_error("list_accounts", e))?;
            items.push(AccountSummary {
                account: decode_account("list_accounts", &row)?,
                balance,
            });
        }

        Ok(Page {
            count: count as u64,
            items,
        })
    }

    #[instrument(
        skip(self, query),
        fields(
            account_id = %account_id,
            order_by = query.order.field,
            limit = page.limit,
            offset = page.offset
        ),
        err
    )]
    async fn list_transactions(
        &self,
        account_id: AccountId,
        query: &ListQuery,
        page: PageRequest,
    ) -> Result<Page<Transaction>, StoreError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM ledger_transactions
            WHERE account_id = $1 AND ($2::BIGINT IS NULL OR id = $2)
            "#,
        )
        .bind(account_id.get())
        .bind(query.id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_transactions", e))?;

        let sql = format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM ledger_transactions t
            WHERE t.account_id = $1 AND ($2::BIGINT IS NULL OR t.id = $2)
            ORDER BY t.{} {}, t.id ASC
            LIMIT $3 OFFSET $4
            "#,
            query.order.field,
            sql_direction(query.order.direction),
        );

        let rows = sqlx::query(&sql)
            .bind(account_id.get())
            .bind(query.id)
            .bind(i64::from(page.limit))
            .bind(offset(page))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_transactions", e))?;

        let items = rows
            .iter()
            .map(|row| decode_transaction("list_transactions", row))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            count: count as u64,
            items,
        })
    }
}

/// A database transaction. Rows read through it are locked `FOR UPDATE`.
pub struct PostgresLedgerUnit {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerUnit for PostgresLedgerUnit {
    #[instrument(skip(self), fields(account_id = %id), err)]
    async fn account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_user_id, account_number, account_name
            FROM ledger_accounts
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.get())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock_account", e))?;

        row.map(|row| decode_account("lock_account", &row)).transpose()
    }

    #[instrument(skip(self), fields(account_id = %account_id, transaction_id = %id), err)]
    async fn transaction(
        &mut self,
        account_id: AccountId,
        id: TransactionId,
    ) -> Result<Option<OwnedTransaction>, StoreError> {
        let sql = format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}, a.owner_user_id
            FROM ledger_transactions t
            JOIN ledger_accounts a ON a.id = t.account_id
            WHERE t.id = $1 AND t.account_id = $2
            FOR UPDATE
            "#
        );

        let row = sqlx::query(&sql)
            .bind(id.get())
            .bind(account_id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lock_transaction", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let owner: i64 = row
            .try_get("owner_user_id")
            .map_err(|e| map_sqlx_error("lock_transaction", e))?;

        Ok(Some(OwnedTransaction {
            transaction: decode_transaction("lock_transaction", &row)?,
            owner: UserId::new(owner),
        }))
    }

    #[instrument(skip(self, values), fields(owner = %owner), err)]
    async fn insert_account(
        &mut self,
        owner: UserId,
        values: AccountFields,
    ) -> Result<Account, StoreError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO ledger_accounts (owner_user_id, account_number, account_name)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(owner.get())
        .bind(&values.account_number)
        .bind(&values.account_name)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_account", e))?;

        Ok(Account {
            id: AccountId::new(id),
            owner,
            account_number: values.account_number,
            account_name: values.account_name,
        })
    }

    #[instrument(skip(self, account), fields(account_id = %account.id), err)]
    async fn update_account(&mut self, account: &Account) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE ledger_accounts
            SET account_number = $2, account_name = $3
            WHERE id = $1
            "#,
        )
        .bind(account.id.get())
        .bind(&account.account_number)
        .bind(&account.account_name)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_account", e))?;

        expect_one_row("update_account", result.rows_affected())
    }

    #[instrument(skip(self), fields(account_id = %id), err)]
    async fn delete_account(&mut self, id: AccountId) -> Result<u64, StoreError> {
        // The foreign key cascades as well; deleting explicitly gives the count.
        let removed = sqlx::query("DELETE FROM ledger_transactions WHERE account_id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_account", e))?
            .rows_affected();

        let result = sqlx::query("DELETE FROM ledger_accounts WHERE id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_account", e))?;
        expect_one_row("delete_account", result.rows_affected())?;

        Ok(removed)
    }

    #[instrument(skip(self, new), fields(account_id = %new.account_id), err)]
    async fn insert_transaction(&mut self, new: NewTransaction) -> Result<Transaction, StoreError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO ledger_transactions
                (account_id, debit_amount, credit_amount, description, verification_number, date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(new.account_id.get())
        .bind(new.amount.debit_amount())
        .bind(new.amount.credit_amount())
        .bind(&new.description)
        .bind(&new.verification_number)
        .bind(new.date)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_transaction", e))?;

        Ok(Transaction {
            id: TransactionId::new(id),
            account_id: new.account_id,
            amount: new.amount,
            description: new.description,
            verification_number: new.verification_number,
            date: new.date,
        })
    }

    #[instrument(skip(self, transaction), fields(transaction_id = %transaction.id), err)]
    async fn update_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE ledger_transactions
            SET debit_amount = $3,
                credit_amount = $4,
                description = $5,
                verification_number = $6,
                date = $7
            WHERE id = $1 AND account_id = $2
            "#,
        )
        .bind(transaction.id.get())
        .bind(transaction.account_id.get())
        .bind(transaction.amount.debit_amount())
        .bind(transaction.amount.credit_amount())
        .bind(&transaction.description)
        .bind(&transaction.verification_number)
        .bind(transaction.date)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_transaction", e))?;

        expect_one_row("update_transaction", result.rows_affected())
    }

    #[instrument(skip(self), fields(transaction_id = %id), err)]
    async fn delete_transaction(&mut self, id: TransactionId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM ledger_transactions WHERE id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_transaction", e))?;

        expect_one_row("delete_transaction", result.rows_affected())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))
    }
}

fn sql_direction(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    }
}

fn offset(page: PageRequest) -> i64 {
    i64::try_from(page.offset).unwrap_or(i64::MAX)
}

fn expect_one_row(operation: &'static str, rows_affected: u64) -> Result<(), StoreError> {
    match rows_affected {
        1 => Ok(()),
        n => Err(StoreError::Backend {
            operation,
            message: format!("expected one row, {n} affected"),
        }),
    }
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message().to_string();
            match db_err.code().as_deref() {
                Some("23505" | "23503" | "23514") => StoreError::Constraint { operation, message },
                _ => StoreError::Backend { operation, message },
            }
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
            StoreError::Unavailable {
                operation,
                message: err.to_string(),
            }
        }
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_) => StoreError::Decode {
            operation,
            message: err.to_string(),
        },
        _ => StoreError::Backend {
            operation,
            message: err.to_string(),
        },
    }
}

// SQLx row types

#[derive(Debug)]
struct AccountRow {
    id: i64,
    owner_user_id: i64,
    account_number: String,
    account_name: String,
}

impl<'r> FromRow<'r, PgRow> for AccountRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(AccountRow {
            id: row.try_get("id")?,
            owner_user_id: row.try_get("owner_user_id")?,
            account_number: row.try_get("account_number")?,
            account_name: row.try_get("account_name")?,
        })
    }
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            id: AccountId::new(row.id),
            owner: UserId::new(row.owner_user_id),
            account_number: row.account_number,
            account_name: row.account_name,
        }
    }
}

#[derive(Debug)]
struct TransactionRow {
    id: i64,
    account_id: i64,
    debit_amount: Option<Decimal>,
    credit_amount: Option<Decimal>,
    description: String,
    verification_number: String,
    date: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for TransactionRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(TransactionRow {
            id: row.try_get("id")?,
            account_id: row.try_get("account_id")?,
            debit_amount: row.try_get("debit_amount")?,
            credit_amount: row.try_get("credit_amount")?,
            description: row.try_get("description")?,
            verification_number: row.try_get("verification_number")?,
            date: row.try_get("date")?,
        })
    }
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = String;

    fn try_from(row: TransactionRow) -> Result<Self, String> {
        let amount = Amount::from_parts(row.debit_amount, row.credit_amount)
            .map_err(|rule| format!("transaction {}: {}", row.id, rule.message()))?;

        Ok(Transaction {
            id: TransactionId::new(row.id),
            account_id: AccountId::new(row.account_id),
            amount,
            description: row.description,
            verification_number: row.verification_number,
            date: row.date,
        })
    }
}

fn decode_account(operation: &'static str, row: &PgRow) -> Result<Account, StoreError> {
    AccountRow::from_row(row)
        .map(Account::from)
        .map_err(|e| map_sqlx_error(operation, e))
}

fn decode_transaction(operation: &'static str, row: &PgRow) -> Result<Transaction, StoreError> {
    let row = TransactionRow::from_row(row).map_err(|e| map_sqlx_error(operation, e))?;
    Transaction::try_from(row).map_err(|message| StoreError::Decode { operation, message })
}
