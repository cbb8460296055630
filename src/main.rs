use anyhow::Context;
use clap::Parser;
use dirmirror::config::Cli;
use dirmirror::logging::{self, TracingSink};
use dirmirror::{Config, Driver, SyncEngine};
use std::process::ExitCode;
use tracing::{debug, error, info};

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Convert CLI args to Config - this validates immediately
    let config = Config::try_from(cli)?;

    let log_file = logging::init(&config)?;
    info!(
        "dirmirror v{}: mirroring {} into {} every {}s (log: {})",
        dirmirror::VERSION,
        config.source.display(),
        config.replica.display(),
        config.interval_secs,
        log_file.display()
    );

    let engine = SyncEngine::from_config(&config).context("failed to start hashing workers")?;
    let sink = TracingSink;

    if config.once {
        return match engine.run_pass(&sink) {
            Ok(report) if report.is_clean() => Ok(ExitCode::SUCCESS),
            Ok(report) => {
                error!("{} operation(s) failed", report.failed);
                Ok(ExitCode::FAILURE)
            }
            Err(err) => {
                error!("Synchronization pass failed: {err}");
                Ok(ExitCode::FAILURE)
            }
        };
    }

    let driver = Driver::new(config.interval()).context("failed to start scheduler")?;
    driver.listen_for_ctrl_c();
    let summary = driver.run(&engine, &sink);

    debug!(
        "{} passes run, {} failed",
        summary.passes, summary.failed_passes
    );
    info!("Synchronization stopped by user. Exiting.");
    Ok(ExitCode::SUCCESS)
}
