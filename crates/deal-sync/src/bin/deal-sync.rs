//! deal-sync - poll Zoho CRM deals and provision Trello project boards.
//!
//! Every flag can also be set through the environment variable named in its help.
//!
//! # Examples
//!
//! ```bash
//! # Run as a daemon, one cycle per minute
//! deal-sync
//!
//! # Run a single cycle and exit
//! deal-sync --once
//!
//! # Skip ticks while a slow cycle is still running, log as JSON
//! deal-sync --overlap-policy skip --log-format json
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use deal_sync::config::{
    DEFAULT_CRM_API_URL, DEFAULT_INTERVAL_SECS, DEFAULT_TOKEN_URL, DEFAULT_TRELLO_API_URL,
};
use deal_sync::{
    Config, CrmConfig, DealSynchronizer, OverlapPolicy, Scheduler, SchedulerConfig, TrelloConfig,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Poll Zoho CRM deals and provision Trello project boards.
#[derive(Parser)]
#[command(name = "deal-sync")]
#[command(version)]
struct Cli {
    /// Zoho OAuth refresh token
    #[arg(long, env = "ZOHO_REFRESH_TOKEN", hide_env_values = true)]
    zoho_refresh_token: String,

    /// Zoho OAuth client ID
    #[arg(long, env = "ZOHO_CLIENT_ID")]
    zoho_client_id: String,

    /// Zoho OAuth client secret
    #[arg(long, env = "ZOHO_CLIENT_SECRET", hide_env_values = true)]
    zoho_client_secret: String,

    /// Redirect URI registered for the Zoho OAuth client
    #[arg(long, env = "ZOHO_REDIRECT_URI")]
    zoho_redirect_uri: Option<String>,

    /// Zoho token endpoint
    #[arg(long, env = "ZOHO_TOKEN_URL", default_value = DEFAULT_TOKEN_URL)]
    zoho_token_url: String,

    /// Zoho CRM API host
    #[arg(long, env = "ZOHO_API_URL", default_value = DEFAULT_CRM_API_URL)]
    zoho_api_url: String,

    /// Trello API key
    #[arg(long, env = "TRELLO_API_KEY", hide_env_values = true)]
    trello_api_key: String,

    /// Trello member token
    #[arg(long, env = "TRELLO_ACCESS_TOKEN", hide_env_values = true)]
    trello_access_token: String,

    /// Trello API host
    #[arg(long, env = "TRELLO_API_URL", default_value = DEFAULT_TRELLO_API_URL)]
    trello_api_url: String,

    /// Seconds between sync cycles
    #[arg(long, env = "SYNC_INTERVAL_SECS", default_value_t = DEFAULT_INTERVAL_SECS)]
    interval_secs: u64,

    /// What to do when a cycle is still running at the next tick (allow, skip)
    #[arg(long, env = "SYNC_OVERLAP_POLICY", default_value = "allow")]
    overlap_policy: OverlapPolicy,

    /// Record the new board id on the CRM deal
    #[arg(long, env = "SYNC_WRITE_BACK")]
    write_back: bool,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            crm: CrmConfig {
                refresh_token: self.zoho_refresh_token.clone(),
                client_id: self.zoho_client_id.clone(),
                client_secret: self.zoho_client_secret.clone(),
                redirect_uri: self.zoho_redirect_uri.clone(),
                token_url: self.zoho_token_url.clone(),
                api_url: self.zoho_api_url.clone(),
            },
            trello: TrelloConfig {
                api_key: self.trello_api_key.clone(),
                access_token: self.trello_access_token.clone(),
                api_url: self.trello_api_url.clone(),
            },
            scheduler: SchedulerConfig {
                interval: Duration::from_secs(self.interval_secs),
                overlap: self.overlap_policy,
            },
            write_back: self.write_back,
        }
    }
}

fn init_tracing(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("deal_sync=info".parse()?);
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry.with(fmt::layer()).init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    let config = cli.config();
    config.validate().context("Invalid configuration")?;

    info!(
        crm = %config.crm.api_url,
        trello = %config.trello.api_url,
        interval_secs = config.scheduler.interval.as_secs(),
        overlap = %config.scheduler.overlap,
        write_back = config.write_back,
        "deal-sync configured"
    );

    let synchronizer =
        DealSynchronizer::from_config(&config).context("Failed to build HTTP client")?;

    if cli.once {
        let report = synchronizer.run().await;
        if report.aborted {
            error!("Sync cycle aborted");
        }
        return Ok(());
    }

    let scheduler = Scheduler::new(&config.scheduler);
    let cancel = CancellationToken::new();
    let handle = {
        let cancel = cancel.clone();
        let job = Arc::new(synchronizer);
        tokio::spawn(async move { scheduler.run(job, cancel).await })
    };

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Received SIGINT, shutting down");
    cancel.cancel();

    let stats = handle.await.context("Scheduler task panicked")?;
    info!(
        cycles = stats.started,
        skipped = stats.skipped,
        "deal-sync shutdown complete"
    );

    Ok(())
}
