use anyhow::Context;
use clap::Parser;
use langfuse_ingest::app::{self, forward_lines};
use langfuse_ingest::{Client, Config};
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // clap prints help, version and usage errors itself.
    let config = Config::try_parse()
        .unwrap_or_else(|e| e.exit())
        .resolve()
        .context("invalid configuration")?;
    app::setup_logging(config.log_level, config.log_json)
        .context("failed to initialise logging")?;

    info!("Starting langfuse-ingest v{}", app::get_version());
    let client = Client::new(config).context("failed to start ingestion client")?;

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT (Ctrl+C), shutting down"),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
        signal_token.cancel();
    });

    let reader = BufReader::new(tokio::io::stdin());
    let forwarded = forward_lines(&client, reader, shutdown).await;

    if let Err(e) = client.close().await {
        warn!("Final flush failed: {}", e);
    }

    let stats = forwarded.context("forwarding stopped")?;
    info!(
        lines = stats.lines,
        forwarded = stats.forwarded,
        wrapped = stats.wrapped,
        rejected = stats.rejected,
        "Input exhausted"
    );
    if let Some(summary) = app::metrics_summary(&client) {
        println!("{summary}");
    }
    Ok(())
}
