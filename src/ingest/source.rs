//! Files handed to the tool and the kind of ledger they come from.

use crate::Result;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File extensions accepted at the boundary. Only `csv` is parsed locally; the others are
/// forwarded to the reconciliation service untouched.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["csv", "pdf", "xlsx", "xls", "png", "jpg", "jpeg"];

/// Which side of the reconciliation a file belongs to. It does not change how a file is parsed,
/// only where it is sent.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// A bank statement export.
    #[default]
    Bank,
    /// An accounting journal export.
    Accounting,
}

serde_plain::derive_display_from_serialize!(FileKind);
serde_plain::derive_fromstr_from_deserialize!(FileKind);

/// A file with an accepted extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    path: PathBuf,
    extension: String,
}

impl SourceFile {
    /// Checks the extension of `path` (case-insensitively) without touching the filesystem.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if !ACCEPTED_EXTENSIONS.contains(&extension.as_str()) {
            bail!(
                "Unsupported file type for '{}', expected one of: .{}",
                path.display(),
                ACCEPTED_EXTENSIONS.join(", .")
            );
        }
        Ok(Self { path, extension })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The lower-case extension, without the dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("upload.{}", self.extension))
    }

    /// Returns true if the ingestion engine can parse this file.
    pub fn is_parsed_locally(&self) -> bool {
        self.extension == "csv"
    }

    /// Reads the whole file into memory.
    pub async fn read_bytes(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Unable to read {}", self.path.display()))
    }
}
