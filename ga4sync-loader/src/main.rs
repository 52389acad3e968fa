//! GA4 report loader service binary.
//!
//! Loads configuration, initializes telemetry, and runs the fetch-aggregate-
//! load-deduplicate pipeline once. Scheduling repeated runs is the job of an
//! external scheduler; the binary exits non-zero when the run fails so the
//! scheduler can tell.

use ga4sync_config::shared::LoaderConfig;
use ga4sync_telemetry::tracing::init_tracing;
use tracing::error;

use crate::config::load_loader_config;
use crate::core::start_loader;
use crate::error::LoaderResult;

mod config;
mod core;
mod error;

/// Entry point for the loader service.
///
/// Loads and validates configuration before any I/O, initializes tracing,
/// starts the async runtime, and launches the pipeline. On failure, a
/// rendered error report goes to stderr and the process exits non-zero.
fn main() {
    if let Err(err) = run() {
        eprintln!("{}", err.render_report());
        std::process::exit(1);
    }
}

fn run() -> LoaderResult<()> {
    let loader_config = load_loader_config()?;

    init_tracing(env!("CARGO_BIN_NAME"));

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(loader_config))
}

/// Main async entry point that runs the loader pipeline.
async fn async_main(loader_config: LoaderConfig) -> LoaderResult<()> {
    if let Err(err) = start_loader(loader_config).await {
        error!("{err}");
        return Err(err);
    }

    Ok(())
}
