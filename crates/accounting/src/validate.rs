use serde::de::DeserializeOwned;

use ledger_core::FieldErrors;

pub(crate) const REQUIRED: &str = "This field is required.";
pub(crate) const BLANK: &str = "This field may not be blank.";

pub const INVALID_STRING: &str = "Not a valid string.";
pub const INVALID_NUMBER: &str = "A valid number is required.";
pub const INVALID_DATETIME: &str =
    "Datetime has wrong format. Use one of these formats instead: YYYY-MM-DDThh:mm[:ss[.uuuuuu]][+HH:MM|-HH:MM|Z].";

/// Client input read field by field from a request body.
pub trait Draft: DeserializeOwned {
    /// Message for a value of `field` that could not be read at all.
    fn invalid_value(field: &str) -> &'static str;
}

/// Required, non-blank text of at most `max_chars` characters.
///
/// Surrounding whitespace is stripped before the length check and is not
/// kept. Returns the value only when it passed; failures are recorded in
/// `errors`.
pub(crate) fn required_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<String>,
    max_chars: usize,
) -> Option<String> {
    let Some(value) = value else {
        errors.add(field, REQUIRED);
        return None;
    };

    let value = value.trim();
    if value.is_empty() {
        errors.add(field, BLANK);
        return None;
    }

    if value.chars().count() > max_chars {
        errors.add(
            field,
            format!("Ensure this field has no more than {max_chars} characters."),
        );
        return None;
    }

    Some(value.to_string())
}
