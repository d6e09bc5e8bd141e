//! Transaction amounts and balance aggregation.

use rust_decimal::Decimal;

use ledger_core::{AmountRule, FieldErrors};

/// Total significant digits an amount may carry (`NUMERIC(15, 5)`).
pub const MAX_DIGITS: u32 = 15;
/// Digits allowed after the decimal point.
pub const DECIMAL_PLACES: u32 = 5;

/// Direction and size of a transaction.
///
/// Exactly one side is ever set and it is always strictly positive, so the
/// "both set" and "none set" states cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Amount {
    Debit(Decimal),
    Credit(Decimal),
}

impl Amount {
    /// Build an amount from the two-field wire/storage format.
    ///
    /// A zero on either side counts as absent.
    pub fn from_parts(debit: Option<Decimal>, credit: Option<Decimal>) -> Result<Self, AmountRule> {
        let debit = debit.filter(|d| !d.is_zero());
        let credit = credit.filter(|c| !c.is_zero());

        match (debit, credit) {
            (None, None) => Err(AmountRule::Missing),
            (Some(_), Some(_)) => Err(AmountRule::BothPresent),
            (Some(d), None) if d > Decimal::ZERO => Ok(Amount::Debit(d)),
            (None, Some(c)) if c > Decimal::ZERO => Ok(Amount::Credit(c)),
            _ => Err(AmountRule::NotPositive),
        }
    }

    pub fn debit_amount(&self) -> Option<Decimal> {
        match self {
            Amount::Debit(d) => Some(*d),
            Amount::Credit(_) => None,
        }
    }

    pub fn credit_amount(&self) -> Option<Decimal> {
        match self {
            Amount::Credit(c) => Some(*c),
            Amount::Debit(_) => None,
        }
    }

    /// Effect on the account balance: credits add, debits subtract.
    pub fn signed(&self) -> Decimal {
        match self {
            Amount::Credit(c) => *c,
            Amount::Debit(d) => -*d,
        }
    }
}

/// Σ credits − Σ debits, in exact decimal arithmetic. Empty input yields zero.
pub fn balance_of<'a, I>(amounts: I) -> Decimal
where
    I: IntoIterator<Item = &'a Amount>,
{
    amounts
        .into_iter()
        .fold(Decimal::ZERO, |acc, amount| acc + amount.signed())
}

/// Record a field error when `value` does not fit `NUMERIC(15, 5)`.
pub(crate) fn check_precision(errors: &mut FieldErrors, field: &str, value: Decimal) {
    let normalized = value.normalize();
    let scale = normalized.scale();
    let mantissa = normalized.mantissa().unsigned_abs();
    let digits = if mantissa == 0 {
        1
    } else {
        mantissa.to_string().len() as u32
    };
    let whole_digits = digits.saturating_sub(scale);
    let max_whole = MAX_DIGITS - DECIMAL_PLACES;

    if digits > MAX_DIGITS {
        errors.add(
            field,
            format!("Ensure that there are no more than {MAX_DIGITS} digits in total."),
        );
    } else if scale > DECIMAL_PLACES {
        errors.add(
            field,
            format!("Ensure that there are no more than {DECIMAL_PLACES} decimal places."),
        );
    } else if whole_digits > max_whole {
        errors.add(
            field,
            format!("Ensure that there are no more than {max_whole} digits before the decimal point."),
        );
    }
}
