//! Main entry point for OpsGraph.

use anyhow::Context;
use opsgraph_common::init_logging;
use opsgraph_report::{log_summary, WeeklyReport};
use tracing::info;

fn main() -> anyhow::Result<()> {
    // Logging settings live in the config, so it is loaded first
    let report = WeeklyReport::from_env().context("failed to load configuration")?;
    let _guard = init_logging(&report.config().logging).context("failed to initialize logging")?;

    info!("Starting OpsGraph weekly report v{}", env!("CARGO_PKG_VERSION"));

    let summary = report.run().context("report run aborted")?;
    log_summary(&summary);

    Ok(())
}
