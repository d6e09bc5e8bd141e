//! Response DTOs and mapping from domain types.
//!
//! Request bodies deserialize straight into `AccountDraft` /
//! `TransactionDraft`; validation happens in the domain.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use ledger_accounting::{AccountSummary, Transaction};

/// Decimals go over the wire as strings, trailing zeros removed.
fn decimal_to_wire(value: Decimal) -> String {
    value.normalize().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountOut {
    pub id: i64,
    pub account_number: String,
    pub account_name: String,
    pub balance: String,
}

impl From<AccountSummary> for AccountOut {
    fn from(summary: AccountSummary) -> Self {
        Self {
            id: summary.account.id.get(),
            account_number: summary.account.account_number,
            account_name: summary.account.account_name,
            balance: decimal_to_wire(summary.balance),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionOut {
    pub id: i64,
    pub debit_amount: Option<String>,
    pub credit_amount: Option<String>,
    pub description: String,
    pub verification_number: String,
    pub date: DateTime<Utc>,
}

impl From<Transaction> for TransactionOut {
    fn from(tx: Transaction) -> Self {
        Self {
            id: tx.id.get(),
            debit_amount: tx.amount.debit_amount().map(decimal_to_wire),
            credit_amount: tx.amount.credit_amount().map(decimal_to_wire),
            description: tx.description,
            verification_number: tx.verification_number,
            date: tx.date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ledger_accounting::{Account, Amount};
    use ledger_core::{AccountId, TransactionId, UserId};
    use serde_json::json;

    #[test]
    fn account_balance_is_a_normalized_string() {
        let out = AccountOut::from(AccountSummary {
            account: Account {
                id: AccountId::new(7),
                owner: UserId::new(1),
                account_number: "123456789".into(),
                account_name: "Test Account".into(),
            },
            balance: Decimal::new(1500000, 5),
        });
        assert_eq!(
            serde_json::to_value(out).unwrap(),
            json!({"id": 7, "account_number": "123456789", "account_name": "Test Account", "balance": "15"})
        );
    }

    #[test]
    fn transaction_exposes_only_its_side() {
        let out = TransactionOut::from(Transaction {
            id: TransactionId::new(3),
            account_id: AccountId::new(7),
            amount: Amount::Debit(Decimal::new(550, 2)),
            description: "Groceries".into(),
            verification_number: "V-1".into(),
            date: Utc.with_ymd_and_hms(2024, 2, 1, 9, 30, 0).unwrap(),
        });
        let value = serde_json::to_value(out).unwrap();
        assert_eq!(value["debit_amount"], "5.5");
        assert_eq!(value["credit_amount"], serde_json::Value::Null);
        assert_eq!(value["date"], "2024-02-01T09:30:00Z");
    }
}
