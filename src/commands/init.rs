use crate::commands::Out;
use crate::{Config, Result};
use anyhow::{bail, Context};
use std::path::Path;

/// Creates the home directory, its subdirectories and an initial `config.json`.
///
/// # Arguments
/// - `recon_home` - The directory that will be the root of the home directory, e.g. `$HOME/recon`
/// - `api_base_url` - The address of the reconciliation service.
/// - `token` - An optional bearer token for the service, stored in the secrets directory.
///
/// # Errors
/// - Returns an error if the home directory already holds a configuration.
/// - Returns an error if any file operations fail.
pub async fn init(recon_home: &Path, api_base_url: &str, token: Option<&str>) -> Result<Out<()>> {
    if Config::exists(recon_home) {
        bail!(
            "A configuration already exists in '{}'",
            recon_home.display()
        );
    }
    let config = Config::create(recon_home, api_base_url, token)
        .await
        .context("Unable to create the home directory and configs")?;
    Ok(format!(
        "Successfully created the recon directory at {}",
        config.root().display()
    )
    .into())
}
