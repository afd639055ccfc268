use crate::commands::Out;
use crate::ingest::{self, DelimiterMode, FileKind, ParseOptions, SourceFile};
use crate::model::{Amount, IngestionResult};
use crate::{Config, Result};
use anyhow::bail;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// What `recon parse` found in a file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseReport {
    pub kind: FileKind,
    pub count: usize,
    pub total: Amount,
    pub reference_balance: Amount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<PathBuf>,
    pub result: IngestionResult,
}

/// Runs the ingestion engine on `file` locally, without contacting the reconciliation service.
///
/// `delimiter` overrides the setting from `config.json`. Unless `snapshot` is false the result is
/// saved under `.parsed/` in the home directory.
pub async fn parse(
    config: &Config,
    file: &Path,
    kind: FileKind,
    delimiter: Option<DelimiterMode>,
    snapshot: bool,
) -> Result<Out<ParseReport>> {
    let source = SourceFile::new(file)?;
    if !source.is_parsed_locally() {
        bail!(
            "Only .csv files can be parsed locally, '{}' is a .{} file",
            source.file_name(),
            source.extension()
        );
    }

    let options = ParseOptions::new(delimiter.unwrap_or_else(|| config.delimiter()));
    debug!("Parsing {} with {options:?}", file.display());
    let result = ingest::ingest_file(source.path(), &options).await?;

    let snapshot = if snapshot {
        Some(config.snapshots().save(kind, &result).await?)
    } else {
        None
    };

    let report = ParseReport {
        kind,
        count: result.len(),
        total: result.total(),
        reference_balance: result.reference_balance(),
        snapshot,
        result,
    };
    let message = format!(
        "Parsed {} transaction(s) from {}: total {}, reference balance {}",
        report.count,
        source.file_name(),
        report.total,
        report.reference_balance
    );
    Ok(Out::new(message, report))
}
