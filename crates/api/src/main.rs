//! SQLPulse - SQL query results as Prometheus metrics
//!
//! Main entry point: loads the configuration, starts one task per job and
//! serves the HTTP surface.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use sqlpulse_app::{serve, AppContext, Cli};
use sqlpulse_common::{LevelFilter, LogLevel, SharedSink, TracingSink};
use sqlpulse_infra::config::load_from_file;
use sqlpulse_infra::observability::init_logging;
use sqlpulse_infra::SqlxConnector;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging()?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting sqlpulse");

    let config = match load_from_file(&cli.config_file) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "Error starting exporter");
            return Ok(ExitCode::FAILURE);
        }
    };

    let console: SharedSink = Arc::new(TracingSink);
    let ctx = AppContext::new(
        &config,
        Arc::new(SqlxConnector::new()),
        cli.history_limit,
        console.clone(),
    )?
    .with_telemetry_path(cli.telemetry_path.clone());
    let ctx = Arc::new(ctx);

    if cli.config_check {
        tracing::info!("Config file is ok exiting...");
        return Ok(ExitCode::SUCCESS);
    }

    if cli.check {
        return Ok(run_check(&ctx, console).await);
    }

    let cancel = CancellationToken::new();
    let jobs = ctx.exporter.run(&cancel);

    let signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutting down");
        }
        signal.cancel();
    });

    let served = serve(ctx, &cli.listen_address, cancel.clone()).await;
    cancel.cancel();
    for job in jobs {
        if let Err(err) = job.await {
            tracing::warn!(error = %err, "Job task ended abnormally");
        }
    }

    if let Err(err) = served {
        tracing::error!(error = %err, "Error starting HTTP server");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Run every job once with console output limited to warnings. Fails when
/// anything at warning level or above was recorded since startup.
async fn run_check(ctx: &AppContext, console: SharedSink) -> ExitCode {
    ctx.log.set_next(Arc::new(LevelFilter::new(LogLevel::Warn, console)));
    ctx.exporter.run_once().await;

    let errors = ctx.exporter.error_count();
    if errors > 0 {
        tracing::error!(errors, "Check failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
