use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer};

use ledger_core::{AccountId, DomainError, DomainResult, Entity, FieldErrors, Owned, TransactionId, UserId};

use crate::amount::{check_precision, Amount};
use crate::filter::Orderable;
use crate::validate::{required_text, Draft, INVALID_DATETIME, INVALID_NUMBER, INVALID_STRING};

pub const DESCRIPTION_MAX: usize = 100;
pub const VERIFICATION_NUMBER_MAX: usize = 20;

/// A single debit or credit posted to one account.
///
/// A transaction never moves to another account; it is removed together with
/// its account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub amount: Amount,
    pub description: String,
    pub verification_number: String,
    pub date: DateTime<Utc>,
}

impl Transaction {
    /// Replace the mutable fields. An absent `date` keeps the stored one.
    pub fn apply(&mut self, fields: TransactionFields) {
        self.amount = fields.amount;
        self.description = fields.description;
        self.verification_number = fields.verification_number;
        if let Some(date) = fields.date {
            self.date = date;
        }
    }
}

impl Entity for Transaction {
    type Id = TransactionId;

    fn id(&self) -> &TransactionId {
        &self.id
    }
}

impl Orderable for Transaction {
    const ORDER_FIELDS: &'static [&'static str] = &[
        "id",
        "debit_amount",
        "credit_amount",
        "description",
        "verification_number",
        "date",
    ];
}

/// A transaction resolved together with the owner of its account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedTransaction {
    pub transaction: Transaction,
    pub owner: UserId,
}

impl Entity for OwnedTransaction {
    type Id = TransactionId;

    fn id(&self) -> &TransactionId {
        &self.transaction.id
    }
}

impl Owned for OwnedTransaction {
    fn owner(&self) -> UserId {
        self.owner
    }

    fn not_found() -> DomainError {
        DomainError::TransactionNotFound
    }
}

/// A transaction ready to be inserted (the store assigns the id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub account_id: AccountId,
    pub amount: Amount,
    pub description: String,
    pub verification_number: String,
    pub date: DateTime<Utc>,
}

/// Validated values for creating or replacing a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionFields {
    pub amount: Amount,
    pub description: String,
    pub verification_number: String,
    pub date: Option<DateTime<Utc>>,
}

impl TransactionFields {
    /// Materialise an insert; the date defaults to `now`.
    pub fn into_new(self, account_id: AccountId, now: DateTime<Utc>) -> NewTransaction {
        NewTransaction {
            account_id,
            amount: self.amount,
            description: self.description,
            verification_number: self.verification_number,
            date: self.date.unwrap_or(now),
        }
    }
}

/// Unvalidated transaction input in the two-amount wire format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TransactionDraft {
    pub debit_amount: Option<Decimal>,
    pub credit_amount: Option<Decimal>,
    pub description: Option<String>,
    pub verification_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub date: Option<DateTime<Utc>>,
}

impl Draft for TransactionDraft {
    fn invalid_value(field: &str) -> &'static str {
        match field {
            "debit_amount" | "credit_amount" => INVALID_NUMBER,
            "date" => INVALID_DATETIME,
            _ => INVALID_STRING,
        }
    }
}

/// RFC 3339, or `YYYY-MM-DDThh:mm[:ss[.f]]` without an offset, read as UTC.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .ok()
        .map(|naive| naive.and_utc())
}

fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    parse_datetime(&raw)
        .map(Some)
        .ok_or_else(|| de::Error::custom(INVALID_DATETIME))
}

impl TransactionDraft {
    /// Field rules are checked first; the debit/credit rule only runs on
    /// otherwise well-formed input.
    pub fn into_fields(self) -> DomainResult<TransactionFields> {
        let mut errors = FieldErrors::new();
        let description = required_text(&mut errors, "description", self.description, DESCRIPTION_MAX);
        let verification_number = required_text(
            &mut errors,
            "verification_number",
            self.verification_number,
            VERIFICATION_NUMBER_MAX,
        );
        if let Some(debit) = self.debit_amount {
            check_precision(&mut errors, "debit_amount", debit);
        }
        if let Some(credit) = self.credit_amount {
            check_precision(&mut errors, "credit_amount", credit);
        }

        let (Some(description), Some(verification_number)) = (description, verification_number) else {
            return Err(DomainError::Validation(errors));
        };
        errors.into_result()?;

        let amount = Amount::from_parts(self.debit_amount, self.credit_amount)?;

        Ok(TransactionFields {
            amount,
            description,
            verification_number,
            date: self.date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ledger_core::AmountRule;
    use rust_decimal_macros::dec;

    fn draft() -> TransactionDraft {
        TransactionDraft {
            credit_amount: Some(dec!(20)),
            description: Some("Test transaction".into()),
            verification_number: Some("123".into()),
            ..TransactionDraft::default()
        }
    }

    #[test]
    fn well_formed_draft_converts() {
        let fields = draft().into_fields().unwrap();
        assert_eq!(fields.amount, Amount::Credit(dec!(20)));
        assert_eq!(fields.date, None);
    }

    #[test]
    fn both_amounts_is_rejected_with_amount_rule() {
        let err = TransactionDraft {
            debit_amount: Some(dec!(20)),
            ..draft()
        }
        .into_fields()
        .unwrap_err();
        assert_eq!(err, DomainError::InvalidAmountCombination(AmountRule::BothPresent));
    }

    #[test]
    fn missing_text_fields_win_over_amount_rule() {
        let err = TransactionDraft::default().into_fields().unwrap_err();
        let DomainError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert_eq!(fields.get("description").unwrap()[0], "This field is required.");
        assert_eq!(fields.get("verification_number").unwrap()[0], "This field is required.");
    }

    #[test]
    fn excess_precision_is_a_field_error() {
        let err = TransactionDraft {
            credit_amount: Some(dec!(1.123456)),
            ..draft()
        }
        .into_fields()
        .unwrap_err();
        let DomainError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert!(fields.get("credit_amount").is_some());
    }

    #[test]
    fn dates_without_offset_are_read_as_utc() {
        let expected = Utc.with_ymd_and_hms(2023, 5, 17, 12, 0, 0).unwrap();
        assert_eq!(parse_datetime("2023-05-17T12:00:00Z"), Some(expected));
        assert_eq!(parse_datetime("2023-05-17T14:00:00+02:00"), Some(expected));
        assert_eq!(parse_datetime("2023-05-17T12:00:00"), Some(expected));
        assert_eq!(parse_datetime("2023-05-17T12:00"), Some(expected));
        assert_eq!(
            parse_datetime("2023-05-17T12:00:00.250000"),
            Some(expected + chrono::Duration::milliseconds(250))
        );
        assert_eq!(parse_datetime("17/05/2023"), None);
    }

    #[test]
    fn draft_reads_naive_and_missing_dates() {
        let draft: TransactionDraft = serde_json::from_value(serde_json::json!({
            "credit_amount": "20",
            "description": "Test transaction",
            "verification_number": "123",
            "date": "2023-05-17T12:00:00",
        }))
        .unwrap();
        assert_eq!(draft.date, Some(Utc.with_ymd_and_hms(2023, 5, 17, 12, 0, 0).unwrap()));

        let draft: TransactionDraft =
            serde_json::from_value(serde_json::json!({ "date": null })).unwrap();
        assert_eq!(draft.date, None);
        let draft: TransactionDraft = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(draft.date, None);

        assert!(serde_json::from_value::<TransactionDraft>(serde_json::json!({ "date": "soon" })).is_err());
    }

    #[test]
    fn unreadable_values_get_per_field_messages() {
        assert_eq!(TransactionDraft::invalid_value("credit_amount"), INVALID_NUMBER);
        assert_eq!(TransactionDraft::invalid_value("date"), INVALID_DATETIME);
        assert_eq!(TransactionDraft::invalid_value("description"), INVALID_STRING);
    }

    #[test]
    fn apply_keeps_date_when_absent() {
        let date = Utc::now();
        let mut tx = draft()
            .into_fields()
            .unwrap()
            .into_new(AccountId::new(1), date);
        assert_eq!(tx.date, date);

        let mut stored = Transaction {
            id: TransactionId::new(1),
            account_id: tx.account_id,
            amount: tx.amount,
            description: std::mem::take(&mut tx.description),
            verification_number: std::mem::take(&mut tx.verification_number),
            date,
        };
        stored.apply(TransactionFields {
            amount: Amount::Debit(dec!(5)),
            description: "Update transaction".into(),
            verification_number: "124".into(),
            date: None,
        });

        assert_eq!(stored.amount, Amount::Debit(dec!(5)));
        assert_eq!(stored.description, "Update transaction");
        assert_eq!(stored.date, date);
    }
}
