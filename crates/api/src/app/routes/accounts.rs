use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};

use serde_json::Value;

use ledger_accounting::AccountDraft;
use ledger_core::AccountId;
use ledger_infra::{selectors, LedgerStore};

use crate::app::dto::AccountOut;
use crate::app::errors;
use crate::app::pagination::{paginated_response, ListParams};
use crate::app::routes::{json_body, path_id};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub async fn list<S>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    Extension(principal): Extension<PrincipalContext>,
    uri: Uri,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response
where
    S: LedgerStore + 'static,
{
    let params = ListParams::from_pairs(pairs);

    match selectors::list_accounts(services.store(), principal.user_id(), &params.filters, params.page).await {
        Ok(page) => paginated_response(&uri, params.page, page.map(AccountOut::from)),
        Err(err) => errors::service_error_to_response(err),
    }
}

/// Answers with the new account's id.
pub async fn create<S>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response
where
    S: LedgerStore + 'static,
{
    let fields = match json_body::<AccountDraft>(body).map(AccountDraft::into_fields) {
        Ok(Ok(fields)) => fields,
        Ok(Err(err)) => return errors::domain_error_to_response(err),
        Err(resp) => return resp,
    };

    match services
        .ledger()
        .create_account(principal.user_id(), fields.account_number, fields.account_name)
        .await
    {
        Ok(account) => (StatusCode::OK, Json(account.id)).into_response(),
        Err(err) => errors::service_error_to_response(err),
    }
}

pub async fn update<S>(
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
    let draft = match json_body::<AccountDraft>(body) {
        Ok(draft) => draft,
        Err(resp) => return resp,
    };

    match services
        .ledger()
        .update_account(principal.user_id(), account_id, draft)
        .await
    {
        Ok(_) => StatusCode::OK.into_response(),
        Err(err) => errors::service_error_to_response(err),
    }
}

pub async fn delete<S>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(account_id): Path<String>,
) -> Response
where
    S: LedgerStore + 'static,
{
    let account_id: AccountId = match path_id(&account_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services
        .ledger()
        .delete_account(principal.user_id(), account_id)
        .await
    {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => errors::service_error_to_response(err),
    }
}
