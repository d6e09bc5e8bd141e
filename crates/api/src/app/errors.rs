//! Consistent `{"detail": ...}` error responses.
//!
//! - not found, filter and order errors: a flat list of messages
//! - field validation errors: `{field: [messages]}`
//! - ownership and amount-rule errors: `{"non_field_errors": [message]}`

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};

use ledger_core::{DomainError, NON_FIELD_ERRORS};
use ledger_infra::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> Response {
    match err {
        ServiceError::Domain(err) => domain_error_to_response(err),
        ServiceError::Store(err) => {
            tracing::error!(error = %err, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "A server error occurred.")
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    (StatusCode::BAD_REQUEST, axum::Json(json!({ "detail": domain_detail(&err) }))).into_response()
}

fn domain_detail(err: &DomainError) -> Value {
    match err {
        DomainError::AccountNotFound
        | DomainError::TransactionNotFound
        | DomainError::InvalidFilterField(_)
        | DomainError::InvalidOrderField(_) => json!([err.to_string()]),
        DomainError::AccountOwnership | DomainError::InvalidAmountCombination(_) => {
            json!({ NON_FIELD_ERRORS: [err.to_string()] })
        }
        DomainError::Validation(fields) => json!(fields),
    }
}

/// A plain `{"detail": message}` body.
pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, axum::Json(json!({ "detail": message.into() }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::{AmountRule, FieldErrors};

    #[test]
    fn not_found_is_a_flat_list() {
        assert_eq!(
            domain_detail(&DomainError::AccountNotFound),
            json!(["account does not exist"])
        );
        assert_eq!(
            domain_detail(&DomainError::InvalidFilterField(vec!["a".into(), "b".into()])),
            json!(["Invalid fields: a,b"])
        );
    }

    #[test]
    fn ownership_and_amount_rule_are_non_field_errors() {
        assert_eq!(
            domain_detail(&DomainError::AccountOwnership),
            json!({ "non_field_errors": ["Account doesn't belong to User"] })
        );
        assert_eq!(
            domain_detail(&DomainError::InvalidAmountCombination(AmountRule::BothPresent)),
            json!({ "non_field_errors": ["Each transaction must have either a debit or a credit amount, but not both"] })
        );
    }

    #[test]
    fn field_errors_are_keyed_by_field() {
        let mut fields = FieldErrors::new();
        fields.add("account_name", "This field is required.");
        assert_eq!(
            domain_detail(&DomainError::Validation(fields)),
            json!({ "account_name": ["This field is required."] })
        );
    }

    #[test]
    fn every_domain_error_is_a_bad_request() {
        let response = domain_error_to_response(DomainError::TransactionNotFound);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
