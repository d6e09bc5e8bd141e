use ledger_core::{DomainError, Owned, UserId};

/// A fully resolved principal for authorization decisions.
///
/// Construction is decoupled from storage and transport: the API derives it
/// from verified claims.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
}

impl Principal {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }
}

/// Ownership guard applied before every mutating operation.
///
/// `resolved` is the outcome of looking the resource up by id:
/// - `None` fails with the resource's own not-found error
/// - a resource owned by someone else fails with `AccountOwnership`
///
/// No IO, no panics. The resource is handed back on success so callers can
/// keep working with it.
pub fn authorize_owner<R: Owned>(principal: &Principal, resolved: Option<R>) -> Result<R, DomainError> {
    let resource = resolved.ok_or_else(R::not_found)?;

    if resource.owner() != principal.user_id {
        tracing::debug!(
            caller = %principal.user_id,
            owner = %resource.owner(),
            "ownership check failed"
        );
        return Err(DomainError::AccountOwnership);
    }

    Ok(resource)
}
