//! Conversion of locale-formatted numeric fields into `Decimal` values.
//!
//! French exports write `1 234,56` where other systems write `1234.56`. The first comma is taken
//! as the decimal separator and all whitespace (including non-breaking spaces used as thousands
//! separators) is removed. What remains is read the way a browser's `parseFloat` reads it: the
//! longest leading decimal literal wins and anything after it is ignored, so `500,000 TND` is
//! `500`.

use rust_decimal::Decimal;
use std::str::FromStr;

/// Parses a raw field into a decimal value, or `None` if the field holds no number.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let normalized: String = raw
        .replacen(',', ".", 1)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let literal = leading_literal(&normalized)?;
    let value = Decimal::from_str(&literal).ok()?;
    if value.is_zero() {
        // no negative zero
        return Some(Decimal::ZERO);
    }
    Some(value)
}

/// Parses a raw field into a decimal value, falling back to zero when the field is empty,
/// missing or malformed.
///
/// The zero fallback lets a dirty row still contribute a transaction. It is used for amount,
/// debit and credit fields; balance fields use `parse_amount` so that garbage does not reset
/// the tracked balance.
pub fn parse_amount_or_zero(raw: &str) -> Decimal {
    parse_amount(raw).unwrap_or(Decimal::ZERO)
}

/// Extracts the longest prefix of `s` matching `[+-]? digits* ('.' digits*)?` with at least one
/// digit, rewritten in a form `Decimal::from_str` accepts.
fn leading_literal(s: &str) -> Option<String> {
    let mut chars = s.chars().peekable();
    let mut negative = false;
    if let Some(&sign) = chars.peek() {
        if sign == '-' || sign == '+' {
            negative = sign == '-';
            chars.next();
        }
    }

    let mut int_digits = String::new();
    while let Some(&c) = chars.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        int_digits.push(c);
        chars.next();
    }

    let mut frac_digits = String::new();
    if chars.peek() == Some(&'.') {
        chars.next();
        while let Some(&c) = chars.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            frac_digits.push(c);
            chars.next();
        }
    }

    if int_digits.is_empty() && frac_digits.is_empty() {
        return None;
    }

    let mut literal = String::with_capacity(int_digits.len() + frac_digits.len() + 3);
    if negative {
        literal.push('-');
    }
    if int_digits.is_empty() {
        literal.push('0');
    } else {
        literal.push_str(&int_digits);
    }
    if !frac_digits.is_empty() {
        literal.push('.');
        literal.push_str(&frac_digits);
    }
    Some(literal)
}
