use std::time::Duration;
use tokio_util::sync::CancellationToken;
use anyhow::{anyhow, bail, Context, Result};
use catalog_client::CatalogClient;
use catalog_syncd::config::Config;
use catalog_syncd::{SyncReport, Syncer};

const DEFAULT_CONFIG_PATH: &str = "/etc/catalog-syncd/syncd.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("catalog_syncd=info,catalog_client=info")
            }),
        )
        .init();

    let mut config_path = None;
    let mut force_dry_run = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--dry-run" => force_dry_run = true,
            _ => config_path = Some(arg),
        }
    }
    let config_path = config_path.unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;

    tracing::info!(
        "Loaded config from {}: {} endpoints scoped by {:?}",
        config_path,
        config.endpoints.len(),
        config.sync.tags
    );

    let client = CatalogClient::new(&config.catalog.client_config())
        .with_context(|| format!("Failed to create catalog client for {}", config.catalog.url))?;
    let syncer = Syncer::new(client).dry_run(config.sync.dry_run || force_dry_run);

    // Ctrl-c stops between requests; mutations already sent stay applied
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            signal_cancel.cancel();
        }
    });

    let deadline = config.sync.deadline_secs.map(Duration::from_secs);
    let report = tokio::select! {
        result = run(&syncer, config, deadline) => result?,
        _ = cancel.cancelled() => bail!("Sync interrupted"),
    };

    tracing::info!(
        "{}Sync finished in {}ms: {} mutations ({} added, {} updated, {} removed), {} in sync, {} kept, {} keep failures",
        if report.dry_run { "[dry-run] " } else { "" },
        (report.finished_at - report.started_at).num_milliseconds(),
        report.mutations(),
        report.added,
        report.updated,
        report.removed,
        report.in_sync,
        report.kept,
        report.keep_missing
    );

    Ok(())
}

async fn run(syncer: &Syncer, config: Config, deadline: Option<Duration>) -> Result<SyncReport> {
    let run = syncer.run(config.endpoints, &config.sync.tags);

    let report = match deadline {
        Some(deadline) => tokio::time::timeout(deadline, run)
            .await
            .map_err(|_| anyhow!("Sync did not finish within {}s", deadline.as_secs()))??,
        None => run.await?,
    };

    Ok(report)
}
