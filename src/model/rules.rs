//! The matching rules submitted to the reconciliation service.
//!
//! This crate does not interpret these values, it only makes sure they are well-formed before
//! they leave the machine.

use crate::{utils, Result};
use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tolerances and thresholds for each matching tier.
///
/// Missing fields in a JSON document take their default value; unknown fields are rejected.
///
/// Example:
/// ```json
/// {
///   "amount_tolerance": 0.01,
///   "date_tolerance_days": 1,
///   "fuzzy_date_tolerance_days": 3,
///   "weak_date_tolerance_days": 7,
///   "label_similarity_threshold": 0.95,
///   "fuzzy_label_threshold": 0.8,
///   "weak_label_threshold": 0.6,
///   "enable_group_matching": true,
///   "max_group_size": 5,
///   "enable_ai_assistance": true
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RulesConfig {
    /// Absolute currency tolerance for the exact tier.
    pub amount_tolerance: f64,
    /// Date window, in days, for the exact tier.
    pub date_tolerance_days: u32,
    /// Date window, in days, for the strong fuzzy tier.
    pub fuzzy_date_tolerance_days: u32,
    /// Date window, in days, for the weak fuzzy tier.
    pub weak_date_tolerance_days: u32,
    /// Label similarity cutoff for the exact tier, in [0, 1].
    pub label_similarity_threshold: f64,
    /// Label similarity cutoff for the strong fuzzy tier, in [0, 1].
    pub fuzzy_label_threshold: f64,
    /// Label similarity cutoff for the weak fuzzy tier, in [0, 1].
    pub weak_label_threshold: f64,
    /// Allows one transaction to match a group of transactions on the other side.
    pub enable_group_matching: bool,
    /// The largest group allowed when group matching is enabled.
    pub max_group_size: u32,
    /// Enables the AI-assisted fallback tier.
    pub enable_ai_assistance: bool,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            amount_tolerance: 0.01,
            date_tolerance_days: 1,
            fuzzy_date_tolerance_days: 3,
            weak_date_tolerance_days: 7,
            label_similarity_threshold: 0.95,
            fuzzy_label_threshold: 0.80,
            weak_label_threshold: 0.60,
            enable_group_matching: true,
            max_group_size: 5,
            enable_ai_assistance: true,
        }
    }
}

impl RulesConfig {
    /// Loads and validates rules from a JSON file.
    pub async fn load(path: &Path) -> Result<Self> {
        let rules: RulesConfig = utils::deserialize(path).await?;
        rules
            .validate()
            .with_context(|| format!("Invalid rules in {}", path.display()))?;
        Ok(rules)
    }

    /// Checks that every option holds a usable value.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.amount_tolerance.is_finite() && self.amount_tolerance >= 0.0,
            "amount_tolerance must be a non-negative number, got {}",
            self.amount_tolerance
        );
        for (name, value) in [
            ("label_similarity_threshold", self.label_similarity_threshold),
            ("fuzzy_label_threshold", self.fuzzy_label_threshold),
            ("weak_label_threshold", self.weak_label_threshold),
        ] {
            ensure!(
                (0.0..=1.0).contains(&value),
                "{name} must be between 0 and 1, got {value}"
            );
        }
        if self.enable_group_matching {
            ensure!(
                self.max_group_size >= 2,
                "max_group_size must be at least 2 when group matching is enabled, got {}",
                self.max_group_size
            );
        }
        Ok(())
    }
}
