//! Types that represent the core data model, such as `Transaction` and `RulesConfig`.
mod amount;
mod reconciliation;
mod rules;
mod transaction;

pub use amount::{Amount, AmountError};
pub use reconciliation::{
    ExportFormat, Match, MatchRule, MatchesResponse, Pagination, ReconcileResponse, Summary,
    SuspenseItem, UploadResponse, ValidateAction, ValidateResponse,
};
pub use rules::RulesConfig;
pub use transaction::{IngestionResult, Transaction};
