//! These structs provide the CLI interface for the recon CLI.

use crate::ingest::{DelimiterMode, FileKind};
use crate::model::{ExportFormat, ValidateAction};
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// recon: Normalize French bank and accounting exports and reconcile them.
///
/// The `parse` command reads a bank statement or accounting journal CSV locally and reports the
/// transactions it finds, whatever the column order, delimiter or number format of the export.
/// The other commands drive a reconciliation service: upload both files, start a job, review
/// and validate the proposed matches, then export the results.
///
/// Set RECON_IN_TEST_MODE to any non-empty value to use an in-memory service instead of a real
/// server.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and initialize the configuration file.
    ///
    /// This is the first command you should run. By default the data directory is $HOME/recon;
    /// pass --recon-home or set RECON_HOME to put it somewhere else.
    Init(InitArgs),
    /// Read a statement or journal CSV locally and report what it contains.
    Parse(ParseArgs),
    /// Send a statement or journal file to the reconciliation service.
    Upload(UploadArgs),
    /// Start a reconciliation job from two uploaded files.
    Reconcile(ReconcileArgs),
    /// Show the results of a reconciliation job.
    Results(ResultsArgs),
    /// Confirm or reject a proposed match.
    Validate(ValidateArgs),
    /// Export the results of a reconciliation job.
    Export(ExportArgs),
    /// Show the regularization entries proposed for a reconciliation job.
    Regularization(JobArgs),
    /// List past reconciliation jobs.
    List,
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG. See the tracing-subscriber EnvFilter documentation.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where recon configuration and snapshots are held. Defaults to ~/recon
    #[arg(long, env = "RECON_HOME", default_value_t = default_recon_home())]
    recon_home: DisplayPath,
}

impl Common {
    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn recon_home(&self) -> &DisplayPath {
        &self.recon_home
    }
}

/// (Not shown): Args for the `recon init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The address of the reconciliation service.
    #[arg(long, default_value = "http://localhost:8000")]
    api_base_url: String,

    /// A bearer token for the reconciliation service. It is stored in the secrets directory.
    #[arg(long)]
    token: Option<String>,
}

impl InitArgs {
    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

/// (Not shown): Args for the `recon parse` command.
#[derive(Debug, Parser, Clone)]
pub struct ParseArgs {
    /// The CSV file to read.
    file: PathBuf,

    /// Which side of the reconciliation the file belongs to. Only used to name the snapshot.
    #[arg(long, default_value_t = FileKind::Bank)]
    kind: FileKind,

    /// How fields are delimited. Defaults to the `delimiter` setting of config.json.
    #[arg(long)]
    delimiter: Option<DelimiterMode>,

    /// Do not save a snapshot of the result in $RECON_HOME/.parsed.
    #[arg(long)]
    no_snapshot: bool,
}

impl ParseArgs {
    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    pub fn delimiter(&self) -> Option<DelimiterMode> {
        self.delimiter
    }

    pub fn snapshot(&self) -> bool {
        !self.no_snapshot
    }
}

/// (Not shown): Args for the `recon upload` command.
#[derive(Debug, Parser, Clone)]
pub struct UploadArgs {
    /// The file to send: .csv, .pdf, .xlsx, .xls, .png, .jpg or .jpeg
    file: PathBuf,

    /// Which side of the reconciliation the file belongs to.
    #[arg(long)]
    kind: FileKind,
}

impl UploadArgs {
    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }
}

/// (Not shown): Args for the `recon reconcile` command.
#[derive(Debug, Parser, Clone)]
pub struct ReconcileArgs {
    /// The upload id of the bank statement.
    #[arg(long)]
    bank: String,

    /// The upload id of the accounting journal.
    #[arg(long)]
    accounting: String,

    /// A JSON file of matching rules. Defaults to the `rules` section of config.json.
    #[arg(long)]
    rules: Option<PathBuf>,
}

impl ReconcileArgs {
    pub fn bank(&self) -> &str {
        &self.bank
    }

    pub fn accounting(&self) -> &str {
        &self.accounting
    }

    pub fn rules(&self) -> Option<&Path> {
        self.rules.as_deref()
    }
}

/// (Not shown): Args for the `recon results` command.
#[derive(Debug, Parser, Clone)]
pub struct ResultsArgs {
    /// The reconciliation job id.
    job: String,

    /// The page of results to show, starting at 1.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    page: u32,
}

impl ResultsArgs {
    pub fn job(&self) -> &str {
        &self.job
    }

    pub fn page(&self) -> u32 {
        self.page
    }
}

/// (Not shown): Args for the `recon validate` command.
#[derive(Debug, Parser, Clone)]
pub struct ValidateArgs {
    /// The reconciliation job id.
    job: String,

    /// The id of the match to act on.
    #[arg(value_name = "MATCH")]
    match_id: String,

    /// Whether to confirm or reject the match.
    #[arg(long)]
    action: ValidateAction,

    /// The ledger account to book the difference to, if any.
    #[arg(long)]
    account_code: Option<String>,
}

impl ValidateArgs {
    pub fn job(&self) -> &str {
        &self.job
    }

    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    pub fn action(&self) -> ValidateAction {
        self.action
    }

    pub fn account_code(&self) -> Option<&str> {
        self.account_code.as_deref()
    }
}

/// (Not shown): Args for the `recon export` command.
#[derive(Debug, Parser, Clone)]
pub struct ExportArgs {
    /// The reconciliation job id.
    job: String,

    #[arg(long, default_value_t = ExportFormat::Excel)]
    format: ExportFormat,

    /// Also write the service's answer to this file.
    #[arg(long)]
    output: Option<PathBuf>,
}

impl ExportArgs {
    pub fn job(&self) -> &str {
        &self.job
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }
}

/// (Not shown): Args for commands that take only a job id.
#[derive(Debug, Parser, Clone)]
pub struct JobArgs {
    /// The reconciliation job id.
    job: String,
}

impl JobArgs {
    pub fn job(&self) -> &str {
        &self.job
    }
}

fn default_recon_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("recon"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --recon-home or RECON_HOME instead of relying on the default \
                recon home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("recon")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}
