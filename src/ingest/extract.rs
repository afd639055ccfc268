//! Per-row extraction of transactions and tracking of the balance column.

use crate::ingest::numeric::{parse_amount, parse_amount_or_zero};
use crate::ingest::ColumnRoles;
use crate::model::{Amount, Transaction};
use rust_decimal::Decimal;

/// The field at `ix`, or an empty string if the role is unassigned or the row is too short.
fn field(fields: &[String], ix: Option<usize>) -> &str {
    ix.and_then(|ix| fields.get(ix))
        .map(String::as_str)
        .unwrap_or("")
}

/// Turns the fields of a data row into a `Transaction`.
///
/// Returns `None` when the row has no date or no label; such rows are dropped without error.
/// When the file has an amount column it is used as-is, otherwise the amount is
/// `credit - debit` with malformed or missing values counting as zero. A difference outside the
/// `Decimal` range also counts as zero.
pub(super) fn extract_row(fields: &[String], roles: &ColumnRoles) -> Option<Transaction> {
    let date = field(fields, Some(roles.date()));
    let label = field(fields, Some(roles.label())).replace('"', "");
    let label = label.trim();
    if date.is_empty() || label.is_empty() {
        return None;
    }

    let amount = match roles.amount() {
        Some(ix) => parse_amount_or_zero(field(fields, Some(ix))),
        None => {
            let credit = parse_amount_or_zero(field(fields, roles.credit()));
            let debit = parse_amount_or_zero(field(fields, roles.debit()));
            credit.checked_sub(debit).unwrap_or(Decimal::ZERO)
        }
    };

    Some(Transaction::new(date, label, Amount::new(amount)))
}

/// Remembers the last parsable value of the balance column across all data rows.
///
/// Unlike amounts, an unparsable balance does not count as zero: the previous value is kept.
#[derive(Debug, Clone)]
pub(super) struct BalanceTracker {
    column: Option<usize>,
    last: Decimal,
}

impl BalanceTracker {
    pub(super) fn new(column: Option<usize>) -> Self {
        Self {
            column,
            last: Decimal::ZERO,
        }
    }

    pub(super) fn observe(&mut self, fields: &[String]) {
        if self.column.is_none() {
            return;
        }
        if let Some(value) = parse_amount(field(fields, self.column)) {
            self.last = value;
        }
    }

    pub(super) fn finish(self) -> Amount {
        Amount::new(self.last)
    }
}
