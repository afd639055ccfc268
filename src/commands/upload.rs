use crate::api::{self, Mode};
use crate::commands::Out;
use crate::ingest::{decode, parse_statement_with, FileKind, ParseOptions, SourceFile};
use crate::model::UploadResponse;
use crate::{Config, Result};
use std::path::Path;
use tracing::{debug, warn};

/// Sends a bank statement or accounting journal to the reconciliation service.
///
/// CSV files run through the local ingestion engine first, so a file the service could not
/// understand is rejected before anything leaves the machine.
pub async fn upload(
    config: &Config,
    mode: Mode,
    file: &Path,
    kind: FileKind,
) -> Result<Out<UploadResponse>> {
    let source = SourceFile::new(file)?;
    let bytes = source.read_bytes().await?;

    let local_rows = if source.is_parsed_locally() {
        let options = ParseOptions::new(config.delimiter());
        let result = parse_statement_with(&decode(&bytes), &options)?;
        debug!("{} holds {} transaction(s)", source.file_name(), result.len());
        Some(result.len())
    } else {
        None
    };

    let mut client = api::client(config, mode).await?;
    let response = client.upload(kind, &source.file_name(), bytes).await?;

    if let Some(rows) = local_rows {
        if rows != response.rows_count {
            warn!(
                "The service counted {} row(s) in {} but {rows} were read locally",
                response.rows_count,
                source.file_name()
            );
        }
    }

    let message = format!(
        "Uploaded {} ({kind}) with {} row(s), upload id {}",
        response.filename, response.rows_count, response.upload_id
    );
    Ok(Out::new(message, response))
}
