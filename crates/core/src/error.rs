//! Domain error model.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Key under which object-level (not per-field) messages are reported.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Per-field validation messages, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `Ok(())` when nothing was recorded, otherwise a `Validation` error.
    pub fn into_result(self) -> DomainResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(self))
        }
    }
}

impl core::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{field}: {}", messages.join(" "))?;
        }
        Ok(())
    }
}

/// Which part of the debit/credit exclusivity rule was broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountRule {
    /// Neither side carries an amount.
    Missing,
    /// Both sides carry an amount.
    BothPresent,
    /// The single amount given is zero or negative.
    NotPositive,
}

impl AmountRule {
    pub fn message(self) -> &'static str {
        match self {
            AmountRule::Missing => "You must provide a debit or credit amount.",
            AmountRule::BothPresent => {
                "Each transaction must have either a debit or a credit amount, but not both"
            }
            AmountRule::NotPositive => "The debit or credit amount must be greater than zero.",
        }
    }
}

impl core::fmt::Display for AmountRule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.message())
    }
}

/// Coarse classification of a [`DomainError`], as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Ownership,
    Validation,
    AmountRule,
}

/// Domain-level error.
///
/// Every variant is a client error: deterministic, never retried, and raised
/// before any write reaches the store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("account does not exist")]
    AccountNotFound,

    #[error("transaction does not exist")]
    TransactionNotFound,

    #[error("Account doesn't belong to User")]
    AccountOwnership,

    #[error("{0}")]
    InvalidAmountCombination(AmountRule),

    /// Filter keys outside the recognised set (sorted).
    #[error("Invalid fields: {}", .0.join(","))]
    InvalidFilterField(Vec<String>),

    #[error("Invalid order field: {0}")]
    InvalidOrderField(String),

    #[error("validation failed: {0}")]
    Validation(FieldErrors),
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(FieldErrors::single(field, message))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::AccountNotFound | DomainError::TransactionNotFound => ErrorKind::NotFound,
            DomainError::AccountOwnership => ErrorKind::Ownership,
            DomainError::InvalidAmountCombination(_) => ErrorKind::AmountRule,
            DomainError::InvalidFilterField(_)
            | DomainError::InvalidOrderField(_)
            | DomainError::Validation(_) => ErrorKind::Validation,
        }
    }
}

impl From<AmountRule> for DomainError {
    fn from(rule: AmountRule) -> Self {
        DomainError::InvalidAmountCombination(rule)
    }
}
