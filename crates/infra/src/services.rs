//! Write operations over the ledger.
//!
//! Every operation follows the same pipeline inside one [`LedgerUnit`]:
//!
//! ```text
//! resolve resource (lock) → ownership guard → validate input → write → commit
//! ```
//!
//! Any failure before `commit` drops the unit, so a rejected operation leaves
//! nothing behind.

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;

use ledger_accounting::{Account, AccountDraft, AccountFields, Transaction, TransactionDraft};
use ledger_auth::{authorize_owner, Principal};
use ledger_core::{AccountId, DomainError, ErrorKind, TransactionId, UserId};

use crate::store::{LedgerStore, LedgerUnit, StoreError};

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Deterministic rejection: not found, ownership, validation, amount rule.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Persisting or reading failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn domain_kind(&self) -> Option<ErrorKind> {
        match self {
            ServiceError::Domain(err) => Some(err.kind()),
            ServiceError::Store(_) => None,
        }
    }
}

/// Account and transaction commands for one store.
#[derive(Debug, Clone)]
pub struct LedgerService<S> {
    store: S,
}

impl<S: LedgerStore> LedgerService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    #[instrument(skip(self, account_number, account_name), fields(user_id = %user_id), err)]
    pub async fn create_account(
        &self,
        user_id: UserId,
        account_number: impl Into<String> + Send,
        account_name: impl Into<String> + Send,
    ) -> Result<Account, ServiceError> {
        let fields = AccountFields::new(account_number, account_name)?;

        let mut unit = self.store.begin().await?;
        let account = unit.insert_account(user_id, fields).await?;
        unit.commit().await?;

        tracing::info!(account_id = %account.id, "account created");
        Ok(account)
    }

    /// Full replacement: both fields are required.
    #[instrument(skip(self, data), fields(user_id = %user_id, account_id = %account_id), err)]
    pub async fn update_account(
        &self,
        user_id: UserId,
        account_id: AccountId,
        data: AccountDraft,
    ) -> Result<Account, ServiceError> {
        let mut unit = self.store.begin().await?;
        let resolved = unit.account(account_id).await?;
        let mut account = authorize_owner(&Principal::new(user_id), resolved)?;

        account.apply(data.into_fields()?);
        unit.update_account(&account).await?;
        unit.commit().await?;

        tracing::info!("account updated");
        Ok(account)
    }

    /// Removes the account and, with it, every transaction posted to it.
    #[instrument(skip(self), fields(user_id = %user_id, account_id = %account_id), err)]
    pub async fn delete_account(
        &self,
        user_id: UserId,
        account_id: AccountId,
    ) -> Result<(), ServiceError> {
        let mut unit = self.store.begin().await?;
        let resolved = unit.account(account_id).await?;
        authorize_owner(&Principal::new(user_id), resolved)?;

        let removed = unit.delete_account(account_id).await?;
        unit.commit().await?;

        tracing::info!(transactions_removed = removed, "account deleted");
        Ok(())
    }

    /// Post a transaction. An absent `date` defaults to now.
    #[instrument(skip(self, data), fields(user_id = %user_id, account_id = %account_id), err)]
    pub async fn create_transaction(
        &self,
        user_id: UserId,
        account_id: AccountId,
        data: TransactionDraft,
    ) -> Result<Transaction, ServiceError> {
        let mut unit = self.store.begin().await?;
        let resolved = unit.account(account_id).await?;
        let account = authorize_owner(&Principal::new(user_id), resolved)?;

        let new = data.into_fields()?.into_new(account.id, Utc::now());
        let transaction = unit.insert_transaction(new).await?;
        unit.commit().await?;

        tracing::info!(transaction_id = %transaction.id, "transaction created");
        Ok(transaction)
    }

    /// Full replacement of amount, description and verification number. An
    /// absent `date` keeps the stored one.
    #[instrument(
        skip(self, data),
        fields(user_id = %user_id, account_id = %account_id, transaction_id = %transaction_id),
        err
    )]
    pub async fn update_transaction(
        &self,
        user_id: UserId,
        account_id: AccountId,
        transaction_id: TransactionId,
        data: TransactionDraft,
    ) -> Result<Transaction, ServiceError> {
        let mut unit = self.store.begin().await?;
        let resolved = unit.transaction(account_id, transaction_id).await?;
        let mut transaction = authorize_owner(&Principal::new(user_id), resolved)?.transaction;

        transaction.apply(data.into_fields()?);
        unit.update_transaction(&transaction).await?;
        unit.commit().await?;

        tracing::info!("transaction updated");
        Ok(transaction)
    }

    #[instrument(
        skip(self),
        fields(user_id = %user_id, account_id = %account_id, transaction_id = %transaction_id),
        err
    )]
    pub async fn delete_transaction(
        &self,
        user_id: UserId,
        account_id: AccountId,
        transaction_id: TransactionId,
    ) -> Result<(), ServiceError> {
        let mut unit = self.store.begin().await?;
        let resolved = unit.transaction(account_id, transaction_id).await?;
        authorize_owner(&Principal::new(user_id), resolved)?;

        unit.delete_transaction(transaction_id).await?;
        unit.commit().await?;

        tracing::info!("transaction deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selectors;
    use crate::store::InMemoryLedgerStore;
    use chrono::TimeZone;
    use ledger_accounting::{Amount, PageRequest};
    use ledger_core::AmountRule;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    const OWNER: UserId = UserId::new(1);
    const INTRUDER: UserId = UserId::new(2);

    fn service() -> LedgerService<InMemoryLedgerStore> {
        LedgerService::new(InMemoryLedgerStore::new())
    }

    fn credit(amount: Decimal) -> TransactionDraft {
        TransactionDraft {
            credit_amount: Some(amount),
            description: Some("Test transaction".into()),
            verification_number: Some("123".into()),
            ..TransactionDraft::default()
        }
    }

    fn debit(amount: Decimal) -> TransactionDraft {
        TransactionDraft {
            debit_amount: Some(amount),
            credit_amount: None,
            ..credit(Decimal::ZERO)
        }
    }

    async fn transaction_count(service: &LedgerService<InMemoryLedgerStore>, account_id: AccountId) -> u64 {
        selectors::list_transactions(service.store(), account_id, &[], PageRequest::all())
            .await
            .unwrap()
            .count
    }

    #[tokio::test]
    async fn balance_follows_postings_and_delete_cascades() {
        let service = service();
        let account = service
            .create_account(OWNER, "123456789", "Test Account")
            .await
            .unwrap();
        let balance = || selectors::account_balance(service.store(), account.id);

        assert_eq!(balance().await.unwrap(), Decimal::ZERO);

        service.create_transaction(OWNER, account.id, credit(dec!(20))).await.unwrap();
        assert_eq!(balance().await.unwrap(), dec!(20));

        service.create_transaction(OWNER, account.id, debit(dec!(5))).await.unwrap();
        assert_eq!(balance().await.unwrap(), dec!(15));

        service.delete_account(OWNER, account.id).await.unwrap();
        assert_eq!(transaction_count(&service, account.id).await, 0);
        assert_eq!(service.store().account(account.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn both_amounts_are_rejected_and_nothing_persists() {
        let service = service();
        let account = service.create_account(OWNER, "1", "a").await.unwrap();

        let err = service
            .create_transaction(
                OWNER,
                account.id,
                TransactionDraft {
                    debit_amount: Some(dec!(20)),
                    ..credit(dec!(20))
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::InvalidAmountCombination(AmountRule::BothPresent))
        ));
        assert_eq!(
            err.to_string(),
            "Each transaction must have either a debit or a credit amount, but not both"
        );
        assert_eq!(transaction_count(&service, account.id).await, 0);
    }

    #[tokio::test]
    async fn missing_and_non_positive_amounts_are_distinct_messages() {
        let service = service();
        let account = service.create_account(OWNER, "1", "a").await.unwrap();

        let missing = service
            .create_transaction(OWNER, account.id, TransactionDraft { credit_amount: None, ..credit(Decimal::ZERO) })
            .await
            .unwrap_err();
        let negative = service
            .create_transaction(OWNER, account.id, debit(dec!(-3)))
            .await
            .unwrap_err();

        assert_eq!(missing.to_string(), "You must provide a debit or credit amount.");
        assert_eq!(negative.to_string(), "The debit or credit amount must be greater than zero.");
        assert_eq!(missing.domain_kind(), Some(ErrorKind::AmountRule));
        assert_eq!(negative.domain_kind(), Some(ErrorKind::AmountRule));
    }

    #[tokio::test]
    async fn foreign_account_update_is_rejected_and_unchanged() {
        let service = service();
        let account = service
            .create_account(OWNER, "123456789", "Test Account")
            .await
            .unwrap();

        let err = service
            .update_account(
                INTRUDER,
                account.id,
                AccountDraft {
                    account_number: Some("987654321".into()),
                    account_name: Some("Hijacked".into()),
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Account doesn't belong to User");
        assert_eq!(service.store().account(account.id).await.unwrap(), Some(account));
    }

    #[tokio::test]
    async fn foreign_transaction_changes_are_rejected() {
        let service = service();
        let account = service.create_account(OWNER, "1", "a").await.unwrap();
        let tx = service.create_transaction(OWNER, account.id, credit(dec!(20))).await.unwrap();

        let update = service
            .update_transaction(INTRUDER, account.id, tx.id, debit(dec!(1)))
            .await
            .unwrap_err();
        let delete = service
            .delete_transaction(INTRUDER, account.id, tx.id)
            .await
            .unwrap_err();
        let post = service
            .create_transaction(INTRUDER, account.id, credit(dec!(1)))
            .await
            .unwrap_err();

        for err in [update, delete, post] {
            assert_eq!(err.domain_kind(), Some(ErrorKind::Ownership));
        }
        assert_eq!(selectors::account_balance(service.store(), account.id).await.unwrap(), dec!(20));
    }

    #[tokio::test]
    async fn not_found_is_distinct_from_ownership() {
        let service = service();
        let account = service.create_account(OWNER, "1", "a").await.unwrap();
        let missing_account = AccountId::new(404);
        let missing_tx = TransactionId::new(404);

        let err = service.delete_account(OWNER, missing_account).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::AccountNotFound)));
        assert_eq!(err.to_string(), "account does not exist");

        let err = service
            .create_transaction(INTRUDER, missing_account, credit(dec!(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::AccountNotFound)));

        let err = service
            .update_transaction(OWNER, account.id, missing_tx, credit(dec!(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::TransactionNotFound)));

        // A transaction addressed through the wrong account does not exist there.
        let tx = service.create_transaction(OWNER, account.id, credit(dec!(1))).await.unwrap();
        let other = service.create_account(OWNER, "2", "b").await.unwrap();
        let err = service.delete_transaction(OWNER, other.id, tx.id).await.unwrap_err();
        assert_eq!(err.to_string(), "transaction does not exist");
    }

    #[tokio::test]
    async fn update_transaction_replaces_fields_and_keeps_date() {
        let service = service();
        let account = service.create_account(OWNER, "1", "a").await.unwrap();
        let date = Utc.with_ymd_and_hms(2023, 5, 17, 12, 0, 0).unwrap();
        let tx = service
            .create_transaction(
                OWNER,
                account.id,
                TransactionDraft {
                    date: Some(date),
                    ..credit(dec!(20))
                },
            )
            .await
            .unwrap();

        let updated = service
            .update_transaction(
                OWNER,
                account.id,
                tx.id,
                TransactionDraft {
                    description: Some("Update transaction".into()),
                    ..debit(dec!(5))
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.amount, Amount::Debit(dec!(5)));
        assert_eq!(updated.description, "Update transaction");
        assert_eq!(updated.date, date);
        assert_eq!(selectors::account_balance(service.store(), account.id).await.unwrap(), dec!(-5));
    }

    #[tokio::test]
    async fn invalid_update_leaves_transaction_untouched() {
        let service = service();
        let account = service.create_account(OWNER, "1", "a").await.unwrap();
        let tx = service.create_transaction(OWNER, account.id, credit(dec!(20))).await.unwrap();

        let err = service
            .update_transaction(
                OWNER,
                account.id,
                tx.id,
                TransactionDraft {
                    debit_amount: Some(dec!(20)),
                    ..credit(dec!(20))
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.domain_kind(), Some(ErrorKind::AmountRule));
        assert_eq!(selectors::account_balance(service.store(), account.id).await.unwrap(), dec!(20));
    }

    #[tokio::test]
    async fn update_account_requires_every_field() {
        let service = service();
        let account = service.create_account(OWNER, "1", "a").await.unwrap();

        let err = service
            .update_account(OWNER, account.id, AccountDraft::default())
            .await
            .unwrap_err();
        assert_eq!(err.domain_kind(), Some(ErrorKind::Validation));

        let updated = service
            .update_account(
                OWNER,
                account.id,
                AccountDraft {
                    account_number: Some("2".into()),
                    account_name: Some("Updated Account".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.account_name, "Updated Account");
        assert_eq!(service.store().account(account.id).await.unwrap(), Some(updated));
    }
}
