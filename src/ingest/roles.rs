//! Assigns semantic roles to the columns of a statement by inspecting its header row.

use crate::ingest::IngestError;
use serde::{Deserialize, Serialize};

/// The meaning of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Date,
    Label,
    Debit,
    Credit,
    Amount,
    Balance,
}

serde_plain::derive_display_from_serialize!(Role);
serde_plain::derive_fromstr_from_deserialize!(Role);

impl Role {
    /// Lower-case fragments that identify a header as holding this role.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Role::Date => &["date"],
            Role::Label => &["libell", "description"],
            Role::Debit => &["debit", "débit"],
            Role::Credit => &["credit", "crédit"],
            Role::Amount => &["montant"],
            Role::Balance => &["solde"],
        }
    }

    /// The column name shown in user-facing messages.
    pub fn display_name(self) -> &'static str {
        match self {
            Role::Date => "date",
            Role::Label => "libellé",
            Role::Debit => "débit",
            Role::Credit => "crédit",
            Role::Amount => "montant",
            Role::Balance => "solde",
        }
    }

    fn matches(self, header: &str) -> bool {
        self.keywords().iter().any(|keyword| header.contains(keyword))
    }
}

/// The column index of each resolved role for one file.
///
/// `date` and `label` are always present, and at least one of `debit`, `credit` and `amount` is.
/// No column holds two roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnRoles {
    date: usize,
    label: usize,
    debit: Option<usize>,
    credit: Option<usize>,
    amount: Option<usize>,
    balance: Option<usize>,
}

impl ColumnRoles {
    /// Resolves roles from the fields of a header row.
    ///
    /// Headers are compared in lower case. Each role goes to the first header containing one of
    /// its keywords, taking roles in the order date, label, debit, credit, amount, balance and
    /// skipping columns an earlier role already took.
    ///
    /// # Errors
    /// - `MissingRequiredColumn` when no header matches `date` or `label`.
    /// - `MissingAmountColumn` when no header matches any of `debit`, `credit` or `amount`.
    pub fn resolve<S: AsRef<str>>(header: &[S]) -> Result<Self, IngestError> {
        let headers: Vec<String> = header
            .iter()
            .map(|h| h.as_ref().trim().to_lowercase())
            .collect();
        let mut claimed = vec![false; headers.len()];
        let mut claim = |role: Role| -> Option<usize> {
            let ix = (0..headers.len()).find(|&ix| !claimed[ix] && role.matches(&headers[ix]))?;
            claimed[ix] = true;
            Some(ix)
        };

        let date = claim(Role::Date);
        let label = claim(Role::Label);
        let debit = claim(Role::Debit);
        let credit = claim(Role::Credit);
        let amount = claim(Role::Amount);
        let balance = claim(Role::Balance);

        let date = date.ok_or(IngestError::MissingRequiredColumn(Role::Date))?;
        let label = label.ok_or(IngestError::MissingRequiredColumn(Role::Label))?;
        if debit.is_none() && credit.is_none() && amount.is_none() {
            return Err(IngestError::MissingAmountColumn);
        }

        Ok(Self {
            date,
            label,
            debit,
            credit,
            amount,
            balance,
        })
    }

    pub fn date(&self) -> usize {
        self.date
    }

    pub fn label(&self) -> usize {
        self.label
    }

    pub fn debit(&self) -> Option<usize> {
        self.debit
    }

    pub fn credit(&self) -> Option<usize> {
        self.credit
    }

    pub fn amount(&self) -> Option<usize> {
        self.amount
    }

    pub fn balance(&self) -> Option<usize> {
        self.balance
    }

    /// The column holding `role`, if any.
    pub fn get(&self, role: Role) -> Option<usize> {
        match role {
            Role::Date => Some(self.date),
            Role::Label => Some(self.label),
            Role::Debit => self.debit,
            Role::Credit => self.credit,
            Role::Amount => self.amount,
            Role::Balance => self.balance,
        }
    }
}
