//! Implements the `ReconciliationApi` trait without a server, for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without a reconciliation service. State is kept in
//! `$RECON_HOME/test_api.json` so that separate invocations see each other's uploads and jobs.
//!
//! Matching is out of scope here: every job completes at once with no matches and every
//! transaction of both files in suspense.

use crate::api::ReconciliationApi;
use crate::ingest::{decode, parse_statement, FileKind, SourceFile};
use crate::model::{
    Amount, ExportFormat, MatchesResponse, Pagination, ReconcileResponse, RulesConfig, Summary,
    SuspenseItem, Transaction, UploadResponse, ValidateAction, ValidateResponse,
};
use crate::{utils, Config, Result};
use anyhow::{bail, ensure, Context};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;
use uuid::Uuid;

const STATE_FILE: &str = "test_api.json";
const PAGE_SIZE: usize = 50;
const PREVIEW_ROWS: usize = 5;
const COMPLETED: &str = "completed";
const NO_MATCH: &str = "Aucune correspondance trouvée";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StoredUpload {
    kind: FileKind,
    filename: String,
    transactions: Vec<Transaction>,
    reference_balance: Amount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StoredJob {
    job_id: String,
    created: DateTime<Utc>,
    bank_upload_id: String,
    accounting_upload_id: String,
    rules: RulesConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct State {
    uploads: BTreeMap<String, StoredUpload>,
    /// Oldest first.
    jobs: Vec<StoredJob>,
}

/// An in-memory reconciliation service.
pub(crate) struct TestApi {
    path: PathBuf,
    state: State,
}

impl TestApi {
    /// Loads the state saved in the home directory of `config`, or starts empty.
    pub(crate) async fn load(config: &Config) -> Result<Self> {
        let path = config.root().join(STATE_FILE);
        let state = if path.is_file() {
            utils::deserialize(&path).await?
        } else {
            State::default()
        };
        Ok(Self { path, state })
    }

    async fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.state)
            .context("Unable to serialize the test service state")?;
        utils::write(&self.path, json).await
    }

    fn job(&self, job_id: &str) -> Result<&StoredJob> {
        self.state
            .jobs
            .iter()
            .find(|job| job.job_id == job_id)
            .with_context(|| format!("Reconciliation job '{job_id}' not found"))
    }

    fn upload_of(&self, upload_id: &str, kind: FileKind) -> Result<&StoredUpload> {
        let upload = self
            .state
            .uploads
            .get(upload_id)
            .with_context(|| format!("Upload '{upload_id}' not found"))?;
        ensure!(
            upload.kind == kind,
            "Upload '{upload_id}' is a {} file, expected a {kind} file",
            upload.kind
        );
        Ok(upload)
    }
}

fn suspense_items(upload: &StoredUpload) -> Result<Vec<SuspenseItem>> {
    upload
        .transactions
        .iter()
        .map(|tx| {
            Ok(SuspenseItem {
                transaction: serde_json::to_value(tx)?,
                kind: upload.kind.to_string(),
                reason: NO_MATCH.to_string(),
                suggested_category: None,
                ai_confidence: None,
            })
        })
        .collect()
}

fn total(upload: &StoredUpload) -> Amount {
    upload.transactions.iter().map(Transaction::amount).sum()
}

#[async_trait::async_trait]
impl ReconciliationApi for TestApi {
    async fn upload(
        &mut self,
        kind: FileKind,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadResponse> {
        let source = SourceFile::new(filename)?;
        let (transactions, reference_balance) = if source.is_parsed_locally() {
            let result = parse_statement(&decode(&bytes))?;
            let balance = result.reference_balance();
            (result.into_transactions(), balance)
        } else {
            (Vec::new(), Amount::ZERO)
        };

        let preview = transactions
            .iter()
            .take(PREVIEW_ROWS)
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let upload_id = Uuid::new_v4().to_string();
        let response = UploadResponse {
            upload_id: upload_id.clone(),
            filename: filename.to_string(),
            rows_count: transactions.len(),
            preview: Some(preview),
        };

        debug!("Stored {kind} upload {upload_id} with {} row(s)", transactions.len());
        self.state.uploads.insert(
            upload_id,
            StoredUpload {
                kind,
                filename: filename.to_string(),
                transactions,
                reference_balance,
            },
        );
        self.save().await?;
        Ok(response)
    }

    async fn start_reconciliation(
        &mut self,
        bank_upload_id: &str,
        accounting_upload_id: &str,
        rules: &RulesConfig,
    ) -> Result<ReconcileResponse> {
        self.upload_of(bank_upload_id, FileKind::Bank)?;
        self.upload_of(accounting_upload_id, FileKind::Accounting)?;
        rules.validate()?;

        let job_id = Uuid::new_v4().to_string();
        self.state.jobs.push(StoredJob {
            job_id: job_id.clone(),
            created: Utc::now(),
            bank_upload_id: bank_upload_id.to_string(),
            accounting_upload_id: accounting_upload_id.to_string(),
            rules: rules.clone(),
        });
        self.save().await?;
        Ok(ReconcileResponse {
            job_id,
            status: COMPLETED.to_string(),
        })
    }

    async fn get_matches(&mut self, job_id: &str, page: u32) -> Result<MatchesResponse> {
        ensure!(page >= 1, "Pages start at 1");
        let job = self.job(job_id)?;
        let bank = self.upload_of(&job.bank_upload_id, FileKind::Bank)?;
        let accounting = self.upload_of(&job.accounting_upload_id, FileKind::Accounting)?;

        let mut suspense = suspense_items(bank)?;
        suspense.extend(suspense_items(accounting)?);

        let bank_total = total(bank).to_f64();
        let accounting_total = total(accounting).to_f64();
        let gap = bank_total - accounting_total;
        let summary = Summary {
            bank_total,
            accounting_total,
            matched_count: 0,
            suspense_count: suspense.len() as u64,
            initial_gap: gap,
            residual_gap: gap,
            coverage_ratio: 0.0,
            opening_balance: bank.reference_balance.to_f64(),
            ai_assisted_matches: None,
        };

        let total_items = suspense.len();
        let total_pages = total_items.div_ceil(PAGE_SIZE);
        let page_items = suspense
            .into_iter()
            .skip((page as usize - 1) * PAGE_SIZE)
            .take(PAGE_SIZE)
            .collect();

        Ok(MatchesResponse {
            job_id: job_id.to_string(),
            summary,
            matches: Vec::new(),
            suspense: Some(page_items),
            pagination: Some(Pagination {
                page,
                limit: PAGE_SIZE as u32,
                total: total_items as u64,
                total_pages: total_pages as u32,
            }),
        })
    }

    async fn validate_match(
        &mut self,
        job_id: &str,
        match_id: &str,
        _action: ValidateAction,
        _account_code: Option<&str>,
    ) -> Result<ValidateResponse> {
        self.job(job_id)?;
        bail!("Match '{match_id}' not found in job '{job_id}'")
    }

    async fn export_results(&mut self, job_id: &str, format: ExportFormat) -> Result<Value> {
        self.job(job_id)?;
        Ok(json!({
            "jobId": job_id,
            "format": format,
            "filename": format!("rapprochement-{job_id}.{}", format.extension()),
        }))
    }

    async fn regularization_entries(&mut self, job_id: &str) -> Result<Value> {
        self.job(job_id)?;
        Ok(json!({ "jobId": job_id, "entries": [] }))
    }

    async fn list_reconciliations(&mut self) -> Result<Vec<Value>> {
        let mut list = Vec::with_capacity(self.state.jobs.len());
        for job in self.state.jobs.iter().rev() {
            let filename = |id: &str| {
                self.state
                    .uploads
                    .get(id)
                    .map(|u| u.filename.clone())
                    .unwrap_or_default()
            };
            list.push(json!({
                "jobId": job.job_id,
                "status": COMPLETED,
                "createdAt": job.created.to_rfc3339(),
                "bankFile": filename(&job.bank_upload_id),
                "accountingFile": filename(&job.accounting_upload_id),
            }));
        }
        Ok(list)
    }
}
