use crate::api::{self, Mode};
use crate::commands::Out;
use crate::model::{
    MatchesResponse, ReconcileResponse, RulesConfig, ValidateAction, ValidateResponse,
};
use crate::{Config, Result};
use anyhow::bail;
use std::path::Path;
use tracing::{debug, warn};

/// Starts a reconciliation job for two uploaded files.
///
/// The rules come from the JSON file at `rules` when given, otherwise from `config.json`. They
/// are validated before the request is sent.
pub async fn reconcile(
    config: &Config,
    mode: Mode,
    bank_upload_id: &str,
    accounting_upload_id: &str,
    rules: Option<&Path>,
) -> Result<Out<ReconcileResponse>> {
    let rules = match rules {
        Some(path) => RulesConfig::load(path).await?,
        None => {
            let rules = config.rules().clone();
            rules.validate()?;
            rules
        }
    };
    debug!("Reconciling with {rules:?}");

    let mut client = api::client(config, mode).await?;
    let response = client
        .start_reconciliation(bank_upload_id, accounting_upload_id, &rules)
        .await?;
    let message = format!(
        "Started reconciliation job {} ({})",
        response.job_id, response.status
    );
    Ok(Out::new(message, response))
}

/// Fetches one page of results and reports any inconsistency in what the service sent.
pub async fn results(
    config: &Config,
    mode: Mode,
    job_id: &str,
    page: u32,
) -> Result<Out<MatchesResponse>> {
    let mut client = api::client(config, mode).await?;
    let response = client.get_matches(job_id, page).await?;

    for violation in response.contract_violations() {
        warn!("Inconsistent results for job {job_id}: {violation}");
    }

    let summary = &response.summary;
    let message = format!(
        "Job {}: {} matched, {} in suspense, coverage {:.1}%, residual gap {:.3}",
        response.job_id,
        summary.matched_count,
        summary.suspense_count,
        summary.coverage_ratio * 100.0,
        summary.residual_gap
    );
    Ok(Out::new(message, response))
}

/// Confirms or rejects a proposed match.
pub async fn validate_match(
    config: &Config,
    mode: Mode,
    job_id: &str,
    match_id: &str,
    action: ValidateAction,
    account_code: Option<&str>,
) -> Result<Out<ValidateResponse>> {
    let mut client = api::client(config, mode).await?;
    let response = client
        .validate_match(job_id, match_id, action, account_code)
        .await?;
    if !response.ok {
        bail!("The service did not accept '{action}' for match {match_id}");
    }
    Ok(Out::new(
        format!("Applied '{action}' to match {match_id} of job {job_id}"),
        response,
    ))
}
