//! Control Center - versioned CLAUDE.md configuration
//!
//! Entry point for the command-line tool. It:
//! 1. Parses arguments ([`Cli`])
//! 2. Loads layered settings from `control-center.yaml` and `CC_*` variables
//! 3. Initializes logging (daily rotating file, console mirror with `--debug`)
//! 4. Runs the command against a [`Workspace`](control_center::Workspace)
//!    on a tokio runtime (needed for the debounced auto-save)
//!
//! Persisted data lives in the configured `data_dir`: `configuration.json`
//! for the live configuration and `snapshots/<id>.json` for the archive.

use anyhow::Result;
use clap::Parser;
use control_center::cli::{self, Cli};
use control_center::{APP_NAME, VERSION};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let (manager, settings) = cli::load_settings(&cli)?;

    let _log_guard = control_center::logging::setup_logging_with_console(
        &settings.log_dir,
        settings.debug_mode,
        cli.debug,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("control-center-worker")
        .build()?;

    let result = runtime.block_on(cli::run(cli.command, &manager, settings));

    runtime.shutdown_timeout(std::time::Duration::from_secs(5));

    if let Err(e) = &result {
        tracing::error!("Command failed: {:#}", e);
    }
    tracing::info!("Shutdown complete");
    result
}
