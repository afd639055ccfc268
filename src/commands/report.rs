use crate::api::{self, Mode};
use crate::commands::Out;
use crate::model::ExportFormat;
use crate::{utils, Config, Result};
use anyhow::Context;
use serde_json::Value;
use std::path::Path;

/// Asks the service to export a job's results. When `output` is given the service's answer is
/// also written there as JSON.
pub async fn export(
    config: &Config,
    mode: Mode,
    job_id: &str,
    format: ExportFormat,
    output: Option<&Path>,
) -> Result<Out<Value>> {
    let mut client = api::client(config, mode).await?;
    let exported = client.export_results(job_id, format).await?;

    let message = match output {
        Some(path) => {
            let json = serde_json::to_string_pretty(&exported)
                .context("Unable to serialize the export")?;
            utils::write(path, json).await?;
            format!("Exported job {job_id} as {format} to {}", path.display())
        }
        None => format!("Exported job {job_id} as {format}"),
    };
    Ok(Out::new(message, exported))
}

/// Fetches the accounting entries proposed to clear a job's residual gap.
pub async fn regularization(config: &Config, mode: Mode, job_id: &str) -> Result<Out<Value>> {
    let mut client = api::client(config, mode).await?;
    let entries = client.regularization_entries(job_id).await?;
    Ok(Out::new(
        format!("Fetched regularization entries for job {job_id}"),
        entries,
    ))
}

/// Lists past reconciliation jobs.
pub async fn list(config: &Config, mode: Mode) -> Result<Out<Vec<Value>>> {
    let mut client = api::client(config, mode).await?;
    let jobs = client.list_reconciliations().await?;
    let ids = jobs
        .iter()
        .filter_map(|job| job.get("jobId").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join(", ");
    let message = match jobs.len() {
        0 => "No reconciliations found".to_string(),
        n => format!("Found {n} reconciliation(s): {ids}"),
    };
    Ok(Out::new(message, jobs))
}
