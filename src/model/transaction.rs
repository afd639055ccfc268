use crate::model::Amount;
use serde::{Deserialize, Serialize};

/// One canonical movement read from a statement or journal export.
///
/// `date` is kept exactly as it appeared in the file; no calendar parsing happens. `amount` is
/// positive for a credit and negative for a debit, whether the file used a single amount column
/// or separate debit and credit columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    date: String,
    label: String,
    amount: Amount,
}

impl Transaction {
    pub fn new(date: impl Into<String>, label: impl Into<String>, amount: Amount) -> Self {
        Self {
            date: date.into(),
            label: label.into(),
            amount,
        }
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }
}

/// The output of one successful parse: transactions in file order and the reference balance.
///
/// `reference_balance` is the last parsable value found in the balance column, or zero when the
/// file has no balance column or no parsable balance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionResult {
    transactions: Vec<Transaction>,
    reference_balance: Amount,
}

impl IngestionResult {
    pub fn new(transactions: Vec<Transaction>, reference_balance: Amount) -> Self {
        Self {
            transactions,
            reference_balance,
        }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn reference_balance(&self) -> Amount {
        self.reference_balance
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// The sum of all transaction amounts, saturating at the bounds of `Decimal`.
    pub fn total(&self) -> Amount {
        self.transactions.iter().map(Transaction::amount).sum()
    }

    pub fn into_transactions(self) -> Vec<Transaction> {
        self.transactions
    }
}
