//! Read-only queries over the ledger.
//!
//! Raw filter pairs are validated here, before the store is touched: an
//! unknown key or a bad `order_by` never reaches a query.

use rust_decimal::Decimal;
use tracing::instrument;

use ledger_accounting::{Account, AccountSummary, ListFilters, Page, PageRequest, Transaction};
use ledger_auth::{authorize_owner, Principal};
use ledger_core::{AccountId, UserId};

use crate::services::ServiceError;
use crate::store::LedgerStore;

/// `user_id`'s accounts with their balances. Accounts of other users are
/// never returned, whatever the filters say.
#[instrument(skip(store, filters), fields(user_id = %user_id), err)]
pub async fn list_accounts<S: LedgerStore>(
    store: &S,
    user_id: UserId,
    filters: &[(String, String)],
    page: PageRequest,
) -> Result<Page<AccountSummary>, ServiceError> {
    let query = parse(filters)?.resolve::<Account>()?;
    Ok(store.list_accounts(user_id, &query, page).await?)
}

/// Transactions of an account the caller has already been authorized for.
#[instrument(skip(store, filters), fields(account_id = %account_id), err)]
pub async fn list_transactions<S: LedgerStore>(
    store: &S,
    account_id: AccountId,
    filters: &[(String, String)],
    page: PageRequest,
) -> Result<Page<Transaction>, ServiceError> {
    let query = parse(filters)?.resolve::<Transaction>()?;
    Ok(store.list_transactions(account_id, &query, page).await?)
}

pub async fn account_balance<S: LedgerStore>(
    store: &S,
    account_id: AccountId,
) -> Result<Decimal, ServiceError> {
    Ok(store.account_balance(account_id).await?)
}

/// Resolve an account for reading, applying the same not-found/ownership
/// rules as the write path.
pub async fn owned_account<S: LedgerStore>(
    store: &S,
    user_id: UserId,
    account_id: AccountId,
) -> Result<Account, ServiceError> {
    let account = store.account(account_id).await?;
    Ok(authorize_owner(&Principal::new(user_id), account)?)
}

fn parse(filters: &[(String, String)]) -> Result<ListFilters, ServiceError> {
    Ok(ListFilters::parse(
        filters.iter().map(|(k, v)| (k.as_str(), v.as_str())),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::LedgerService;
    use crate::store::InMemoryLedgerStore;
    use ledger_accounting::{AccountDraft, TransactionDraft};
    use ledger_core::{DomainError, ErrorKind};
    use rust_decimal_macros::dec;

    const ALICE: UserId = UserId::new(1);
    const BOB: UserId = UserId::new(2);

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    async fn ledger() -> (LedgerService<InMemoryLedgerStore>, AccountId) {
        let service = LedgerService::new(InMemoryLedgerStore::new());
        let account = service
            .create_account(ALICE, "123456789", "Test Account")
            .await
            .unwrap();
        service.create_account(ALICE, "2", "Second").await.unwrap();
        service.create_account(BOB, "3", "Bob's").await.unwrap();
        service
            .create_transaction(
                ALICE,
                account.id,
                TransactionDraft {
                    credit_amount: Some(dec!(20)),
                    description: Some("Test transaction".into()),
                    verification_number: Some("123".into()),
                    ..TransactionDraft::default()
                },
            )
            .await
            .unwrap();
        (service, account.id)
    }

    #[tokio::test]
    async fn accounts_are_scoped_to_owner() {
        let (service, _) = ledger().await;

        let page = list_accounts(service.store(), ALICE, &[], PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.count, 2);
        assert!(page.items.iter().all(|s| s.account.owner == ALICE));

        // Bob's account id is 3; filtering on it as Alice finds nothing.
        let page = list_accounts(service.store(), ALICE, &pairs(&[("id", "3")]), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page, Page::empty());
    }

    #[tokio::test]
    async fn listing_carries_balances() {
        let (service, account_id) = ledger().await;

        let page = list_accounts(
            service.store(),
            ALICE,
            &pairs(&[("order_by", "-account_name")]),
            PageRequest::default(),
        )
        .await
        .unwrap();
        let first = &page.items[0];
        assert_eq!(first.account.id, account_id);
        assert_eq!(first.balance, dec!(20));
        assert_eq!(page.items[1].balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn unknown_filter_key_fails_before_query() {
        let (service, account_id) = ledger().await;

        let err = list_transactions(
            service.store(),
            account_id,
            &pairs(&[("id", "1"), ("invalid_param", "1")]),
            PageRequest::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::InvalidFilterField(ref keys)) if keys == &["invalid_param".to_string()]
        ));
    }

    #[tokio::test]
    async fn bad_order_field_is_rejected() {
        let (service, _) = ledger().await;

        let err = list_accounts(
            service.store(),
            ALICE,
            &pairs(&[("order_by", "balance")]),
            PageRequest::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::InvalidOrderField(_))
        ));
    }

    #[tokio::test]
    async fn owned_account_distinguishes_missing_from_foreign() {
        let (service, account_id) = ledger().await;

        assert!(owned_account(service.store(), ALICE, account_id).await.is_ok());

        let foreign = owned_account(service.store(), BOB, account_id).await.unwrap_err();
        assert_eq!(foreign.domain_kind(), Some(ErrorKind::Ownership));

        let missing = owned_account(service.store(), ALICE, AccountId::new(404))
            .await
            .unwrap_err();
        assert_eq!(missing.domain_kind(), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn balance_selector_reflects_store_state() {
        let (service, account_id) = ledger().await;
        assert_eq!(account_balance(service.store(), account_id).await.unwrap(), dec!(20));

        service
            .update_account(
                ALICE,
                account_id,
                AccountDraft {
                    account_number: Some("1".into()),
                    account_name: Some("Renamed".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(account_balance(service.store(), account_id).await.unwrap(), dec!(20));
    }
}
