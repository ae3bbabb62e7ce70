//! Conversion between locale-grouped text and integer monetary amounts.
//!
//! Amounts are whole currency units, so formatting never rounds. Parsing is
//! forgiving: grouping separators and any other non-digit
//! characters are dropped, and empty input reads as zero.

use serde::{Deserialize, Deserializer};

/// Whole currency units. Signed so over-consumed allocations can report a
/// negative remainder.
pub type Amount = i64;

pub const DEFAULT_GROUPING_SEPARATOR: char = ',';

/// Renders `amount` with the default thousands separator.
pub fn format_amount(amount: Amount) -> String {
    format_amount_with(amount, DEFAULT_GROUPING_SEPARATOR)
}

/// Renders `amount` grouping every three digits with `separator`.
pub fn format_amount_with(amount: Amount, separator: char) -> String {
    let digits = amount.unsigned_abs().to_string();
    let grouped = group_digits(&digits, separator);
    if amount < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Reads an amount typed by a user, using the default separator.
pub fn parse_amount(text: &str) -> Amount {
    parse_amount_with(text, DEFAULT_GROUPING_SEPARATOR)
}

/// Reads an amount typed by a user. Every character that is not an ASCII
/// digit is ignored (signs included), so the result is never negative.
/// Values beyond the representable range saturate.
pub fn parse_amount_with(text: &str, separator: char) -> Amount {
    let mut value: Amount = 0;
    for ch in text.chars() {
        if ch == separator {
            continue;
        }
        if let Some(digit) = ch.to_digit(10) {
            value = value
                .saturating_mul(10)
                .saturating_add(Amount::from(digit));
        }
    }
    value
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    let lead = digits.len() % 3;
    for (idx, ch) in digits.chars().enumerate() {
        if idx != 0 && (idx + 3 - lead) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(ch);
    }
    grouped
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Int(i64),
    Float(f64),
    Text(String),
}

impl RawAmount {
    fn into_amount(self) -> Option<Amount> {
        match self {
            RawAmount::Int(value) => Some(value),
            RawAmount::Float(value) => Some(value.round() as Amount),
            RawAmount::Text(text) if text.trim().is_empty() => None,
            RawAmount::Text(text) => Some(parse_amount(&text)),
        }
    }
}

/// Accepts JSON numbers or grouped strings (spreadsheet cells) for an amount.
pub(crate) fn de_amount<'de, D>(deserializer: D) -> Result<Amount, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawAmount>::deserialize(deserializer)?;
    Ok(raw.and_then(RawAmount::into_amount).unwrap_or(0))
}

/// Like [`de_amount`] but keeps "absent" distinct from zero.
pub(crate) fn de_optional_amount<'de, D>(deserializer: D) -> Result<Option<Amount>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawAmount>::deserialize(deserializer)?;
    Ok(raw.and_then(RawAmount::into_amount))
}
