//! Tally - Substrate value-transfer indexer.
//!
//! # Usage
//!
//! ```bash
//! # Start with default config
//! tally
//!
//! # Start with environment overrides
//! DATABASE_URL=postgres://localhost/tally WS_URL=ws://localhost:9944 tally
//! ```

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tokio::sync::watch;
use tracing::{Instrument, debug, error, info, info_span, warn};
use tracing_subscriber::{EnvFilter, fmt};

use tally_core::error::IndexerError;
use tally_core::metrics::init_metrics;
use tally_core::ports::{AddressCodec, BatchSource, JOYSTREAM_SS58_PREFIX, Ss58Codec};
use tally_core::services::{IndexerConfig, IndexerService};
use tally_handlers::transfer_handlers;
use tally_storage::{Database, DatabaseConfig, PgRepositories};
use tally_substrate::{SubstrateClient, SubstrateClientConfig};

/// Tally CLI - value-transfer indexer for Substrate chains.
#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(about = "Tally - Substrate value-transfer indexer")]
#[command(version)]
struct Cli {
    /// Substrate node WebSocket URL.
    #[arg(long, env = "WS_URL", default_value = "ws://127.0.0.1:9944")]
    ws_url: String,

    /// PostgreSQL database URL.
    #[arg(long, env = "DATABASE_URL", default_value = "postgres://localhost/tally")]
    database_url: String,

    /// SS58 network prefix used to encode addresses.
    #[arg(long, env = "SS58_PREFIX", default_value_t = JOYSTREAM_SS58_PREFIX)]
    ss58_prefix: u16,

    /// Maximum block fetches per second (0 = unlimited).
    #[arg(long, env = "RATE_LIMIT", default_value = "0")]
    rate_limit: u32,

    /// Maximum number of blocks committed together.
    #[arg(long, env = "BATCH_SIZE", default_value = "50")]
    batch_size: usize,

    /// Prometheus metrics port.
    #[arg(long, env = "METRICS_PORT", default_value = "9090")]
    metrics_port: u16,

    /// Enable JSON log output.
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,

    /// Run database migrations and exit.
    #[arg(long)]
    migrate_only: bool,

    /// Purge all indexed data from the database and exit.
    ///
    /// This will delete all transfers and accounts and reset the indexer
    /// cursor. Schema/migrations are preserved.
    #[arg(long)]
    purge: bool,

    /// Skip confirmation prompt for destructive operations (like --purge).
    #[arg(long, short = 'y')]
    yes: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Cli {
    fn codec(&self) -> Result<Ss58Codec> {
        Ss58Codec::new(self.ss58_prefix)
            .ok_or_else(|| anyhow!("Invalid SS58 prefix {} (must be < 16384)", self.ss58_prefix))
    }

    fn substrate_config(&self) -> Result<SubstrateClientConfig> {
        if self.batch_size == 0 {
            bail!("BATCH_SIZE must be at least 1");
        }
        Ok(SubstrateClientConfig {
            ws_url: self.ws_url.clone(),
            rate_limit: self.rate_limit,
            max_batch_blocks: self.batch_size,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    let codec = cli.codec()?;
    let substrate_config = cli.substrate_config()?;

    // Prometheus metrics exporter (optional - failures don't crash the app)
    let metrics_enabled = match format!("0.0.0.0:{}", cli.metrics_port).parse::<std::net::SocketAddr>() {
        Ok(metrics_addr) => {
            match PrometheusBuilder::new()
                .with_http_listener(metrics_addr)
                .install()
            {
                Ok(()) => {
                    init_metrics();
                    true
                }
                Err(e) => {
                    warn!("⚠️  Failed to start metrics exporter: {}. Continuing without metrics.", e);
                    false
                }
            }
        }
        Err(e) => {
            warn!("⚠️  Invalid metrics address: {}. Continuing without metrics.", e);
            false
        }
    };

    // ─────────────────────────────────────────────────────────────────────────
    // 🚀 STARTUP
    // ─────────────────────────────────────────────────────────────────────────
    info!("🚀 Starting Tally Indexer");
    debug!(ws_url = %cli.ws_url, "Substrate endpoint");
    debug!(database_url = %mask_password(&cli.database_url), "Database endpoint");
    debug!(ss58_prefix = codec.prefix(), "Address encoding");

    // ─────────────────────────────────────────────────────────────────────────
    // 🗄️ DATABASE
    // ─────────────────────────────────────────────────────────────────────────
    info!("🗄️  Connecting to database...");
    let db = Database::connect(&DatabaseConfig::for_indexer(&cli.database_url))
        .await
        .context("Failed to connect to database")?;

    db.migrate().await.context("Failed to run migrations")?;
    info!("🗄️  Database ready (migrations applied)");

    if cli.migrate_only {
        info!("🛑 --migrate-only flag set, exiting");
        return Ok(());
    }

    if cli.purge {
        return handle_purge(&db, cli.yes).await;
    }

    let db = Arc::new(db);
    let repositories = Arc::new(PgRepositories::new(db.clone()));

    // ─────────────────────────────────────────────────────────────────────────
    // 📡 SUBSTRATE CONNECTION
    // ─────────────────────────────────────────────────────────────────────────
    info!("📡 Connecting to Substrate node...");
    let substrate_client = SubstrateClient::connect(substrate_config)
        .await
        .context("Failed to connect to Substrate node")?;
    let substrate_client = Arc::new(substrate_client);

    let genesis_hash = substrate_client.genesis_hash().await?;
    info!(genesis = %hex::encode(&genesis_hash.0[..8]), "🔗 Chain connected");

    let codec: Arc<dyn AddressCodec> = Arc::new(codec);
    let handlers = Arc::new(transfer_handlers(codec));

    let indexer = IndexerService::new(
        IndexerConfig {
            chain_id: hex::encode(genesis_hash.0),
        },
        substrate_client,
        repositories,
        handlers,
    );

    // ─────────────────────────────────────────────────────────────────────────
    // ⚡ SERVICES START
    // ─────────────────────────────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut indexer_handle = tokio::spawn(
        async move {
            match indexer.run(shutdown_rx).await {
                Ok(()) | Err(IndexerError::ShutdownRequested) => Ok(()),
                Err(e) => {
                    error!(error = %e, "❌ Indexer stopped");
                    Err(e)
                }
            }
        }
        .instrument(info_span!("indexer")),
    );

    // ─────────────────────────────────────────────────────────────────────────
    // ✅ READY
    // ─────────────────────────────────────────────────────────────────────────
    info!("✅ Tally ready");
    if metrics_enabled {
        info!(
            "   📊 Metrics:  http://localhost:{}/metrics",
            cli.metrics_port
        );
    } else {
        info!("   📊 Metrics:  disabled");
    }
    info!("   Press Ctrl+C to stop");

    // A failed batch stops the indexer; exiting non-zero lets the supervisor
    // restart from the last committed cursor.
    let outcome = tokio::select! {
        _ = shutdown_signal() => None,
        result = &mut indexer_handle => Some(result),
    };

    // ─────────────────────────────────────────────────────────────────────────
    // 🛑 SHUTDOWN
    // ─────────────────────────────────────────────────────────────────────────
    let result = match outcome {
        Some(joined) => joined.context("Indexer task panicked")?.map_err(anyhow::Error::from),
        None => {
            info!("🛑 Shutting down...");
            let _ = shutdown_tx.send(true);

            match tokio::time::timeout(Duration::from_secs(30), indexer_handle).await {
                Ok(_) => debug!("Indexer stopped"),
                Err(_) => warn!("⚠️  Indexer shutdown timed out"),
            }
            Ok(())
        }
    };

    db.close().await;

    info!("🛑 Shutdown complete");
    result
}

/// Initialize tracing subscriber.
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }
}

/// Mask password in database URL for logging.
fn mask_password(url_str: &str) -> String {
    match url::Url::parse(url_str) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("****"));
            }
            url.to_string()
        }
        Err(_) => url_str.to_string(),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Handle the --purge command.
async fn handle_purge(db: &Database, skip_confirmation: bool) -> Result<()> {
    warn!("⚠️  PURGE MODE: This will delete ALL indexed data!");
    warn!("   - All transfers and accounts");
    warn!("   - The indexer cursor will be reset");
    warn!("   - Schema and migrations will be preserved");

    if !skip_confirmation {
        print!("\n🔴 Are you sure you want to purge all data? [y/N] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            info!("❌ Purge cancelled");
            return Ok(());
        }
    }

    info!("🗑️  Purging database...");
    let stats = db.purge().await.context("Failed to purge database")?;

    info!("✅ Database purged successfully");
    info!("   💸 Transfers removed: {}", stats.transfers_removed);
    info!("   👤 Accounts removed: {}", stats.accounts_removed);
    info!("   The indexer will start from the chain head on next run");

    Ok(())
}
