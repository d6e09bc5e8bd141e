use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};

use serde_json::Value;

use ledger_accounting::TransactionDraft;
use ledger_core::{AccountId, TransactionId};
use ledger_infra::{selectors, LedgerStore};

use crate::app::dto::TransactionOut;
use crate::app::errors;
use crate::app::pagination::{paginated_response, ListParams};
use crate::app::routes::{json_body, path_id};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

fn path_ids(account_id: &str, transaction_id: &str) -> Result<(AccountId, TransactionId), Response> {
    Ok((path_id(account_id)?, path_id(transaction_id)?))
}

/// Lists an account's transactions once the caller is confirmed as its owner.
pub async fn list<S>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(account_id): Path<String>,
    uri: Uri,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response
where
    S: LedgerStore + 'static,
{
    let account_id: AccountId = match path_id(&account_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if let Err(err) = selectors::owned_account(services.store(), principal.user_id(), account_id).await {
        return errors::service_error_to_response(err);
    }

    let params = ListParams::from_pairs(pairs);
    match selectors::list_transactions(services.store(), account_id, &params.filters, params.page).await {
        Ok(page) => paginated_response(&uri, params.page, page.map(TransactionOut::from)),
        Err(err) => errors::service_error_to_response(err),
    }
}

/// Answers with the new transaction's id.
pub async fn create<S>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(account_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response
where
    S: LedgerStore + 'static,
{
    let account_id: AccountId = match path_id(&account_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let draft = match json_body::<TransactionDraft>(body) {
        Ok(draft) => draft,
        Err(resp) => return resp,
    };

    match services
        .ledger()
        .create_transaction(principal.user_id(), account_id, draft)
        .await
    {
        Ok(tx) => (StatusCode::OK, Json(tx.id)).into_response(),
        Err(err) => errors::service_error_to_response(err),
    }
}

pub async fn update<S>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((account_id, transaction_id)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response
where
    S: LedgerStore + 'static,
{
    let (account_id, transaction_id) = match path_ids(&account_id, &transaction_id) {
        Ok(ids) => ids,
        Err(resp) => return resp,
    };
    let draft = match json_body::<TransactionDraft>(body) {
        Ok(draft) => draft,
        Err(resp) => return resp,
    };

    match services
        .ledger()
        .update_transaction(principal.user_id(), account_id, transaction_id, draft)
        .await
    {
        Ok(_) => StatusCode::OK.into_response(),
        Err(err) => errors::service_error_to_response(err),
    }
}

pub async fn delete<S>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((account_id, transaction_id)): Path<(String, String)>,
) -> Response
where
    S: LedgerStore + 'static,
{
    let (account_id, transaction_id) = match path_ids(&account_id, &transaction_id) {
        Ok(ids) => ids,
        Err(resp) => return resp,
    };

    match services
        .ledger()
        .delete_transaction(principal.user_id(), account_id, transaction_id)
        .await
    {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => errors::service_error_to_response(err),
    }
}
