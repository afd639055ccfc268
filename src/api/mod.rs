//! Access to the reconciliation service.
//!
//! The service owns matching. This module sends it files and rules and brings back its answers
//! through the `ReconciliationApi` trait. `HttpApi` talks to a real server; `TestApi` keeps
//! everything in memory so the whole program can run without one.

mod http;
mod test_api;

use crate::ingest::FileKind;
use crate::model::{
    ExportFormat, MatchesResponse, ReconcileResponse, RulesConfig, UploadResponse,
    ValidateAction, ValidateResponse,
};
use crate::{Config, Result};
use serde_json::Value;
use tracing::debug;

pub(crate) use http::HttpApi;
pub(crate) use test_api::TestApi;

/// When set to a non-empty value, `Mode::from_env` selects `Mode::Test`.
pub const TEST_MODE_ENV: &str = "RECON_IN_TEST_MODE";

/// Selects which implementation of `ReconciliationApi` is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Use the remote service over HTTP.
    #[default]
    Remote,
    /// Use the in-memory implementation.
    Test,
}

impl Mode {
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Remote,
        }
    }
}

/// The operations offered by the reconciliation service.
#[async_trait::async_trait]
pub trait ReconciliationApi: Send {
    /// Sends a bank statement or accounting journal file.
    async fn upload(
        &mut self,
        kind: FileKind,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadResponse>;

    /// Starts matching two uploaded files with `rules`.
    async fn start_reconciliation(
        &mut self,
        bank_upload_id: &str,
        accounting_upload_id: &str,
        rules: &RulesConfig,
    ) -> Result<ReconcileResponse>;

    /// Fetches one page of results. Pages start at 1.
    async fn get_matches(&mut self, job_id: &str, page: u32) -> Result<MatchesResponse>;

    async fn validate_match(
        &mut self,
        job_id: &str,
        match_id: &str,
        action: ValidateAction,
        account_code: Option<&str>,
    ) -> Result<ValidateResponse>;

    async fn export_results(&mut self, job_id: &str, format: ExportFormat) -> Result<Value>;

    async fn regularization_entries(&mut self, job_id: &str) -> Result<Value>;

    async fn list_reconciliations(&mut self) -> Result<Vec<Value>>;
}

/// Constructs the `ReconciliationApi` implementation selected by `mode`.
pub async fn client(config: &Config, mode: Mode) -> Result<Box<dyn ReconciliationApi>> {
    debug!("Creating the reconciliation client in {mode:?} mode");
    match mode {
        Mode::Remote => Ok(Box::new(HttpApi::new(config).await?)),
        Mode::Test => Ok(Box::new(TestApi::load(config).await?)),
    }
}
