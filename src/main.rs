use clap::Parser;
use recon_ingest::args::{Args, Command};
use recon_ingest::{commands, Config, Mode, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().recon_home().path();

    // When RECON_IN_TEST_MODE is set and non-empty the in-memory service is used instead of the
    // remote one.
    let mode = Mode::from_env();

    let _: () = match args.command() {
        Command::Init(init_args) => {
            commands::init(home, init_args.api_base_url(), init_args.token())
                .await?
                .print()
        }

        Command::Parse(parse_args) => {
            let config = Config::load(home).await?;
            commands::parse(
                &config,
                parse_args.file(),
                parse_args.kind(),
                parse_args.delimiter(),
                parse_args.snapshot(),
            )
            .await?
            .print()
        }

        Command::Upload(upload_args) => {
            let config = Config::load(home).await?;
            commands::upload(&config, mode, upload_args.file(), upload_args.kind())
                .await?
                .print()
        }

        Command::Reconcile(reconcile_args) => {
            let config = Config::load(home).await?;
            commands::reconcile(
                &config,
                mode,
                reconcile_args.bank(),
                reconcile_args.accounting(),
                reconcile_args.rules(),
            )
            .await?
            .print()
        }

        Command::Results(results_args) => {
            let config = Config::load(home).await?;
            commands::results(&config, mode, results_args.job(), results_args.page())
                .await?
                .print()
        }

        Command::Validate(validate_args) => {
            let config = Config::load(home).await?;
            commands::validate_match(
                &config,
                mode,
                validate_args.job(),
                validate_args.match_id(),
                validate_args.action(),
                validate_args.account_code(),
            )
            .await?
            .print()
        }

        Command::Export(export_args) => {
            let config = Config::load(home).await?;
            commands::export(
                &config,
                mode,
                export_args.job(),
                export_args.format(),
                export_args.output(),
            )
            .await?
            .print()
        }

        Command::Regularization(job_args) => {
            let config = Config::load(home).await?;
            commands::regularization(&config, mode, job_args.job())
                .await?
                .print()
        }

        Command::List => {
            let config = Config::load(home).await?;
            commands::list(&config, mode).await?.print()
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            let level = level.to_string().to_lowercase();
            EnvFilter::new(format!(
                "{}={level},{}={level}",
                env!("CARGO_CRATE_NAME"),
                env!("CARGO_BIN_NAME"),
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
