//! recon-ingest: normalizes French bank statement and accounting journal exports into canonical
//! transactions, and drives a remote reconciliation service with the results.

pub mod api;
pub mod args;
pub mod commands;
mod config;
mod error;
pub mod ingest;
pub mod model;
mod snapshot;
mod utils;


pub use api::Mode;
pub use config::Config;
pub use error::Error;
pub use error::Result;
