//! Request and response shapes exchanged with the reconciliation service.
//!
//! The service does the matching. These types only carry its answers and let us check that the
//! answers are self-consistent before showing them.

use serde::{Deserialize, Serialize};

/// Handle returned by the service for an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub upload_id: String,
    pub filename: String,
    pub rows_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<Vec<serde_json::Value>>,
}

/// Handle returned when a reconciliation job is started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResponse {
    pub job_id: String,
    pub status: String,
}

/// The tier that produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
    Exact,
    FuzzyStrong,
    FuzzyWeak,
    AiAssisted,
    Group,
    /// Anything the service sends that is not one of the tiers above.
    #[serde(other)]
    Unknown,
}

serde_plain::derive_display_from_serialize!(MatchRule);

/// Aggregate figures of a reconciliation job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub bank_total: f64,
    pub accounting_total: f64,
    pub matched_count: u64,
    pub suspense_count: u64,
    pub initial_gap: f64,
    pub residual_gap: f64,
    pub coverage_ratio: f64,
    pub opening_balance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_assisted_matches: Option<u64>,
}

/// A pairing proposed by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,
    pub bank_tx: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accounting_tx: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accounting_txs: Option<Vec<serde_json::Value>>,
    pub score: f64,
    pub rule: MatchRule,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recon_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_confidence: Option<f64>,
}

/// A transaction the service could not pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspenseItem {
    pub transaction: serde_json::Value,
    #[serde(rename = "type")]
    pub kind: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_confidence: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

/// One page of results for a reconciliation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchesResponse {
    pub job_id: String,
    pub summary: Summary,
    pub matches: Vec<Match>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspense: Option<Vec<SuspenseItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

/// How far a reported coverage ratio may drift from the recomputed one.
const COVERAGE_EPSILON: f64 = 1e-6;

impl MatchesResponse {
    /// Lists every way this response breaks the result contract: the coverage ratio must equal
    /// `matched / (matched + suspense)`, every score must lie in [0, 1] and every rule must be a
    /// known tier. An empty list means the response is consistent.
    pub fn contract_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        let summary = &self.summary;

        let denominator = summary.matched_count + summary.suspense_count;
        if denominator > 0 {
            let expected = summary.matched_count as f64 / denominator as f64;
            if (summary.coverage_ratio - expected).abs() > COVERAGE_EPSILON {
                violations.push(format!(
                    "coverageRatio is {} but matched/(matched + suspense) is {expected}",
                    summary.coverage_ratio
                ));
            }
        }

        for m in &self.matches {
            if !(0.0..=1.0).contains(&m.score) {
                violations.push(format!("match {} has a score of {} outside [0, 1]", m.id, m.score));
            }
            if m.rule == MatchRule::Unknown {
                violations.push(format!("match {} has an unknown rule", m.id));
            }
        }
        violations
    }
}

/// What to do with a proposed match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ValidateAction {
    /// Accept the match.
    Confirm,
    /// Reject the match and send its transactions back to suspense.
    Unmatch,
}

serde_plain::derive_display_from_serialize!(ValidateAction);
serde_plain::derive_fromstr_from_deserialize!(ValidateAction);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub ok: bool,
}

/// The file formats the service can export results to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Excel,
    Pdf,
    Csv,
}

serde_plain::derive_display_from_serialize!(ExportFormat);
serde_plain::derive_fromstr_from_deserialize!(ExportFormat);

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Excel => "xlsx",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Csv => "csv",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(summary: serde_json::Value, matches: serde_json::Value) -> MatchesResponse {
        serde_json::from_value(json!({
            "jobId": "job-1",
            "summary": summary,
            "matches": matches,
        }))
        .unwrap()
    }

    fn summary(matched: u64, suspense: u64, coverage: f64) -> serde_json::Value {
        json!({
            "bankTotal": 474.5,
            "accountingTotal": 474.5,
            "matchedCount": matched,
            "suspenseCount": suspense,
            "initialGap": 0.0,
            "residualGap": 0.0,
            "coverageRatio": coverage,
            "openingBalance": 1000.0
        })
    }

    #[test]
    fn test_consistent_response() {
        let r = response(
            summary(3, 1, 0.75),
            json!([{
                "id": "m1",
                "bankTx": {"date": "01/01/2024"},
                "accountingTx": {"date": "01/01/2024"},
                "score": 1.0,
                "rule": "exact",
                "status": "matched"
            }]),
        );
        assert!(r.contract_violations().is_empty());
        assert_eq!(r.matches[0].rule, MatchRule::Exact);
    }

    #[test]
    fn test_wrong_coverage_ratio() {
        let r = response(summary(3, 1, 0.5), json!([]));
        let violations = r.contract_violations();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("coverageRatio"));
    }

    #[test]
    fn test_empty_job_has_no_ratio_to_check() {
        let r = response(summary(0, 0, 0.0), json!([]));
        assert!(r.contract_violations().is_empty());
    }

    #[test]
    fn test_bad_score_and_unknown_rule() {
        let r = response(
            summary(1, 0, 1.0),
            json!([{
                "id": "m1",
                "bankTx": {},
                "score": 1.5,
                "rule": "telepathy",
                "status": "matched"
            }]),
        );
        assert_eq!(r.matches[0].rule, MatchRule::Unknown);
        assert_eq!(r.contract_violations().len(), 2);
    }

    #[test]
    fn test_group_match_rule_names() {
        assert_eq!(MatchRule::FuzzyStrong.to_string(), "fuzzy_strong");
        assert_eq!(MatchRule::AiAssisted.to_string(), "ai_assisted");
    }

    #[test]
    fn test_suspense_item_type_field() {
        let item: SuspenseItem = serde_json::from_value(json!({
            "transaction": {"label": "FRAIS"},
            "type": "bank",
            "reason": "no match"
        }))
        .unwrap();
        assert_eq!(item.kind, "bank");
    }

    #[test]
    fn test_export_format() {
        assert_eq!(ExportFormat::default().to_string(), "excel");
        assert_eq!(ExportFormat::Excel.extension(), "xlsx");
        assert_eq!("pdf".parse::<ExportFormat>().unwrap(), ExportFormat::Pdf);
    }
}
