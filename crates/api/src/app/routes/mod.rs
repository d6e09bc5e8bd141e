use std::str::FromStr;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use serde_path_to_error::Segment;

use ledger_accounting::Draft;
use ledger_core::DomainError;
use ledger_infra::LedgerStore;

use crate::app::errors;

pub mod accounts;
pub mod system;
pub mod transactions;

/// Router for all authenticated (user-scoped) endpoints.
pub fn router<S>() -> Router
where
    S: LedgerStore + 'static,
{
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/accounts", get(accounts::list::<S>))
        .route("/accounts/create", post(accounts::create::<S>))
        .route("/accounts/:account_id/update", post(accounts::update::<S>))
        .route("/accounts/:account_id/delete", post(accounts::delete::<S>))
        .route("/accounts/:account_id/transactions", get(transactions::list::<S>))
        .route(
            "/accounts/:account_id/transactions/create",
            post(transactions::create::<S>),
        )
        .route(
            "/accounts/:account_id/transactions/:transaction_id/update",
            post(transactions::update::<S>),
        )
        .route(
            "/accounts/:account_id/transactions/:transaction_id/delete",
            post(transactions::delete::<S>),
        )
}

/// Read a draft out of a JSON body.
///
/// A body that is not JSON at all answers 400 with the parser's message. A
/// field whose value cannot be read answers a field error for that field.
pub(crate) fn json_body<T: Draft>(body: Result<Json<Value>, JsonRejection>) -> Result<T, Response> {
    let Json(value) = body
        .map_err(|rejection| errors::json_error(StatusCode::BAD_REQUEST, rejection.body_text()))?;

    serde_path_to_error::deserialize(value).map_err(|err| {
        let field = err.path().iter().find_map(|segment| match segment {
            Segment::Map { key } => Some(key.clone()),
            _ => None,
        });
        match field {
            Some(field) => {
                let message = T::invalid_value(&field);
                errors::domain_error_to_response(DomainError::validation(field, message))
            }
            None => errors::json_error(StatusCode::BAD_REQUEST, err.inner().to_string()),
        }
    })
}

/// Parse a path segment into a typed id.
pub(crate) fn path_id<T>(raw: &str) -> Result<T, Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse().map_err(errors::domain_error_to_response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;
    use ledger_accounting::{AccountDraft, TransactionDraft};
    use serde_json::json;

    async fn rejected<T: Draft + core::fmt::Debug>(body: Value) -> (StatusCode, Value) {
        let response = json_body::<T>(Ok(Json(body))).unwrap_err().into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn unreadable_amount_is_a_field_error() {
        let (status, body) = rejected::<TransactionDraft>(json!({
            "credit_amount": "abc",
            "description": "Test transaction",
            "verification_number": "123",
        }))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "detail": { "credit_amount": ["A valid number is required."] } }));
    }

    #[tokio::test]
    async fn wrong_typed_text_and_date_are_field_errors() {
        let (_, body) = rejected::<AccountDraft>(json!({ "account_number": 1, "account_name": "a" })).await;
        assert_eq!(body["detail"]["account_number"][0], "Not a valid string.");

        let (_, body) = rejected::<TransactionDraft>(json!({ "date": "yesterday" })).await;
        assert!(body["detail"]["date"][0].as_str().unwrap().starts_with("Datetime has wrong format."));
    }

    #[tokio::test]
    async fn non_object_body_keeps_the_parser_message() {
        let (status, body) = rejected::<AccountDraft>(json!([1, 2])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());
    }

    #[test]
    fn readable_body_converts() {
        let body = json!({ "account_number": "1", "account_name": "a" });
        let Ok(draft) = json_body::<AccountDraft>(Ok(Json(body))) else {
            panic!("well-formed body should convert");
        };
        assert_eq!(draft.account_name.as_deref(), Some("a"));
    }
}
