//! Configuration file handling.
//!
//! The configuration file is stored at `$RECON_HOME/config.json` and holds the address of the
//! reconciliation service, the default matching rules and ingestion settings. The bearer token
//! for the service lives in `$RECON_HOME/.secrets/token` unless configured elsewhere.

use crate::ingest::DelimiterMode;
use crate::model::RulesConfig;
use crate::snapshot::Snapshots;
use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

const APP_NAME: &str = "recon";
const CONFIG_VERSION: u8 = 1;
const SNAPSHOT_COPIES: u32 = 5;
const TIMEOUT_SECS: u64 = 600;
const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
const SECRETS: &str = ".secrets";
const PARSED: &str = ".parsed";
const TOKEN: &str = "token";
const CONFIG_JSON: &str = "config.json";

/// Overrides `api_base_url` from the config file.
pub const API_BASE_URL_ENV: &str = "RECON_API_BASE_URL";

/// Overrides the token stored in the token file.
pub const API_TOKEN_ENV: &str = "RECON_API_TOKEN";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$RECON_HOME` and from there it loads `$RECON_HOME/config.json`. It provides
/// paths to other items that are expected in a certain location within the home directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    secrets: PathBuf,
    snapshots: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
}

impl Config {
    /// Creates the home directory, its subdirectories and an initial `config.json`.
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the root of the home directory, e.g. `$HOME/recon`
    /// - `api_base_url` - The address of the reconciliation service, e.g. `http://localhost:8000`
    /// - `token` - An optional bearer token, written to the token file.
    ///
    /// # Errors
    /// - Returns an error if the URL is invalid or any file operation fails.
    pub async fn create(
        dir: impl Into<PathBuf>,
        api_base_url: &str,
        token: Option<&str>,
    ) -> Result<Self> {
        parse_base_url(api_base_url)?;

        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the recon home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let secrets = root.join(SECRETS);
        utils::make_dir(&secrets).await?;
        let snapshots = root.join(PARSED);
        utils::make_dir(&snapshots).await?;

        let config_path = root.join(CONFIG_JSON);
        let config_file = ConfigFile {
            api_base_url: api_base_url.to_string(),
            ..ConfigFile::default()
        };
        config_file.save(&config_path).await?;

        let config = Self {
            root,
            secrets,
            snapshots,
            config_path,
            config_file,
        };
        if let Some(token) = token {
            utils::write(config.token_path(), token.trim()).await?;
        }
        Ok(config)
    }

    /// This will
    /// - validate that `recon_home` exists and that the config file exists
    /// - load and validate the config file
    /// - validate that the secrets and snapshot directories exist
    /// - return the loaded configuration object
    pub async fn load(recon_home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = recon_home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("Recon Home is missing, run 'recon init' first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let config = Self {
            secrets: root.join(SECRETS),
            snapshots: root.join(PARSED),
            root,
            config_path,
            config_file,
        };
        if !config.secrets.is_dir() {
            bail!(
                "The secrets directory is missing '{}'",
                config.secrets.display()
            )
        }
        if !config.snapshots.is_dir() {
            bail!(
                "The snapshots directory is missing '{}'",
                config.snapshots.display()
            )
        }
        Ok(config)
    }

    /// Returns true if `recon_home` holds a config file.
    pub fn exists(recon_home: &Path) -> bool {
        recon_home.join(CONFIG_JSON).is_file()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn secrets(&self) -> &Path {
        &self.secrets
    }

    pub fn snapshots_dir(&self) -> &Path {
        &self.snapshots
    }

    pub fn snapshot_copies(&self) -> u32 {
        self.config_file.snapshot_copies
    }

    /// Creates a new `Snapshots` instance for saving parsed statements.
    pub fn snapshots(&self) -> Snapshots {
        Snapshots::new(self)
    }

    /// The address of the reconciliation service. `RECON_API_BASE_URL` takes precedence over
    /// the config file.
    pub fn api_base_url(&self) -> Result<Url> {
        match std::env::var(API_BASE_URL_ENV) {
            Ok(url) if !url.is_empty() => {
                debug!("Using {API_BASE_URL_ENV}={url}");
                parse_base_url(&url)
            }
            _ => parse_base_url(&self.config_file.api_base_url),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.config_file.timeout_secs)
    }

    pub fn delimiter(&self) -> DelimiterMode {
        self.config_file.delimiter
    }

    /// The matching rules used when none are given on the command line.
    pub fn rules(&self) -> &RulesConfig {
        &self.config_file.rules
    }

    /// Returns the stored `token_path` if it is absolute, otherwise resolves the relative path.
    pub fn token_path(&self) -> PathBuf {
        let p = self.config_file.token_path();
        if p.is_absolute() {
            return p;
        }
        self.root.join(p)
    }

    /// The bearer token for the reconciliation service, if one is available. `RECON_API_TOKEN`
    /// takes precedence over the token file.
    pub async fn token(&self) -> Result<Option<String>> {
        if let Ok(token) = std::env::var(API_TOKEN_ENV) {
            if !token.trim().is_empty() {
                return Ok(Some(token.trim().to_string()));
            }
        }
        let path = self.token_path();
        if !path.is_file() {
            return Ok(None);
        }
        let token = utils::read(&path).await?;
        let token = token.trim();
        Ok((!token.is_empty()).then(|| token.to_string()))
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "recon",
///   "config_version": 1,
///   "api_base_url": "http://localhost:8000",
///   "timeout_secs": 600,
///   "snapshot_copies": 5,
///   "delimiter": "sniff",
///   "token_path": ".secrets/token",
///   "rules": { "amount_tolerance": 0.01, "max_group_size": 5 }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "recon"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Address of the reconciliation service
    api_base_url: String,

    /// Request timeout for the reconciliation service, large jobs take minutes
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,

    /// Number of snapshots to keep per file kind
    #[serde(default = "default_snapshot_copies")]
    snapshot_copies: u32,

    /// How CSV fields are delimited
    #[serde(default)]
    delimiter: DelimiterMode,

    /// Path to the bearer token file (optional, relative to the home directory or absolute)
    /// Defaults to $RECON_HOME/.secrets/token if not specified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_path: Option<PathBuf>,

    /// Default matching rules
    #[serde(default)]
    rules: RulesConfig,
}

fn default_timeout_secs() -> u64 {
    TIMEOUT_SECS
}

fn default_snapshot_copies() -> u32 {
    SNAPSHOT_COPIES
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: TIMEOUT_SECS,
            snapshot_copies: SNAPSHOT_COPIES,
            delimiter: DelimiterMode::default(),
            token_path: None,
            rules: RulesConfig::default(),
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile asynchronously from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or holds invalid values
    async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        parse_base_url(&config.api_base_url)
            .with_context(|| format!("Invalid api_base_url in {}", path.display()))?;
        config
            .rules
            .validate()
            .with_context(|| format!("Invalid rules in {}", path.display()))?;

        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }

    /// Gets the token path.
    ///
    /// If the path is relative, it should be interpreted as relative to the home directory.
    /// If None, defaults to $RECON_HOME/.secrets/token
    fn token_path(&self) -> PathBuf {
        self.token_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(TOKEN))
    }
}

/// Parses a service address. Only `http` and `https` are accepted.
fn parse_base_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).with_context(|| format!("Invalid service URL '{url}'"))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        bail!("The service URL must use http or https, got '{url}'");
    }
    Ok(parsed)
}
