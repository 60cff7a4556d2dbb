//! Trade simulator entry point.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use rust_decimal::Decimal;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use trade_simulator::api::{create_router, AppState};
use trade_simulator::config::Config;
use trade_simulator::metrics;
use trade_simulator::orderbook::{load_snapshots, MarketFeed};
use trade_simulator::simulator::{replay, run_ingestion, run_reporter, Simulator};
use trade_simulator::utils::shutdown_signal;

/// Snapshots buffered between the feed and the ingestion task.
const FEED_BUFFER: usize = 1024;

/// Real-time execution cost estimator for an L2 order book feed.
#[derive(Parser, Debug)]
#[command(name = "trade-simulator")]
#[command(about = "Estimate slippage, fees and market impact from a live order book")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream the live feed and serve reports (default).
    Run {
        #[command(flatten)]
        order: OrderOverrides,

        /// HTTP server port for health/metrics.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Replay newline-delimited JSON snapshots and print the final report.
    Replay {
        /// File with one snapshot per line.
        path: PathBuf,

        #[command(flatten)]
        order: OrderOverrides,
    },

    /// Check configuration validity.
    CheckConfig,
}

/// Order parameter overrides shared by the commands.
#[derive(clap::Args, Debug, Default)]
struct OrderOverrides {
    /// Order notional in USD.
    #[arg(long)]
    quantity: Option<Decimal>,

    /// Order side: buy or sell.
    #[arg(long)]
    side: Option<String>,

    /// Volatility as a fraction (0.02 = 2%).
    #[arg(long)]
    volatility: Option<f64>,

    /// Fee tier: vip0 through vip5.
    #[arg(long)]
    fee_tier: Option<String>,
}

impl OrderOverrides {
    fn apply(self, config: &mut Config) {
        if let Some(quantity) = self.quantity {
            config.order_quantity_usd = quantity;
        }
        if let Some(side) = self.side {
            config.order_side = side;
        }
        if let Some(volatility) = self.volatility {
            config.volatility = volatility;
        }
        if let Some(tier) = self.fee_tier {
            config.fee_tier = tier;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("trade_simulator=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Handle subcommands
    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(),
        Some(Command::Replay { path, order }) => cmd_replay(path, order),
        Some(Command::Run { order, port }) => cmd_run(order, port).await,
        None => cmd_run(OrderOverrides::default(), None).await,
    }
}

/// Load, override and validate the configuration.
fn load_config(order: OrderOverrides) -> anyhow::Result<Config> {
    info!("Loading configuration...");
    let mut config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    order.apply(&mut config);

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    Ok(config)
}

/// Check configuration validity.
fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("TRADE SIMULATOR - CONFIGURATION CHECK");
    println!("======================================================================");

    // Load configuration
    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    // Validate configuration
    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    let params = config.order_params()?;
    let model = config.cost_model();
    let rates = params.fee_tier.rates();

    // Show configuration summary
    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Feed: {}", config.feed_ws_url);
    println!("  Instrument: {} {}", config.exchange, config.symbol);
    println!("  Order: {} ${}", params.side, params.quantity_usd);
    println!("  Volatility: {}", params.volatility);
    println!(
        "  Fee Tier: {} (maker {}, taker {})",
        params.fee_tier, rates.maker, rates.taker
    );
    println!("  Fallback Daily Volume: ${}", model.fallback_daily_volume());
    println!("  Report Interval: {}ms", config.report_interval_ms);
    println!(
        "  Reconnect: {} retries, {}ms initial delay",
        if config.ws_max_retries == 0 {
            "unlimited".to_string()
        } else {
            config.ws_max_retries.to_string()
        },
        config.ws_retry_delay_ms
    );
    println!("  HTTP Port: {}", config.port);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Replay a recorded file and print the final report as JSON.
fn cmd_replay(path: PathBuf, order: OrderOverrides) -> anyhow::Result<()> {
    let config = load_config(order)?;
    metrics::init_metrics();

    let snapshots = load_snapshots(&path)?;
    let mut simulator = Simulator::new(
        config.exchange.clone(),
        config.symbol.clone(),
        config.cost_model(),
        config.order_params()?,
    )?;

    let summary = replay(&mut simulator, &snapshots);
    simulator.stop();
    info!(
        applied = summary.applied,
        rejected = summary.rejected,
        "Replay finished"
    );

    println!("{}", serde_json::to_string_pretty(&simulator.report())?);
    Ok(())
}

/// Stream the live feed and serve reports until shutdown.
async fn cmd_run(order: OrderOverrides, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = load_config(order)?;
    if let Some(port) = port {
        config.port = port;
    }

    // Initialize metrics
    let prometheus = PrometheusBuilder::new().install_recorder()?;
    metrics::init_metrics();

    let params = config.order_params()?;
    info!("Configuration loaded successfully");
    info!("Feed: {}", config.feed_ws_url);
    info!("Order: {} ${} ({})", params.side, params.quantity_usd, params.fee_tier);

    let simulator = Simulator::new(
        config.exchange.clone(),
        config.symbol.clone(),
        config.cost_model(),
        params,
    )?
    .into_shared();

    let initial_report = simulator.read().await.report();
    let (report_tx, report_rx) = watch::channel(initial_report);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Start the feed and the processing tasks
    let feed = Arc::new(MarketFeed::with_reconnect_config(
        config.feed_ws_url.clone(),
        config.reconnect_config(),
    ));
    let snapshots = feed.clone().run_with_reconnect(FEED_BUFFER);

    let mut ingestion = tokio::spawn(run_ingestion(
        simulator.clone(),
        snapshots,
        shutdown_rx.clone(),
    ));
    let reporter = tokio::spawn(run_reporter(
        simulator.clone(),
        Duration::from_millis(config.report_interval_ms),
        report_tx,
        shutdown_rx.clone(),
    ));

    // Start HTTP server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let router = create_router(AppState::new(simulator.clone(), report_rx).with_metrics(prometheus));
    let mut server_shutdown = shutdown_rx.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.wait_for(|stop| *stop).await;
            })
            .await
    });

    let feed_ended = tokio::select! {
        () = shutdown_signal() => false,
        result = &mut ingestion => {
            if let Err(e) = result {
                error!("Ingestion task failed: {}", e);
            }
            true
        }
    };

    let _ = shutdown_tx.send(true);

    if !feed_ended {
        if let Err(e) = ingestion.await {
            error!("Ingestion task failed: {}", e);
        }
    }
    if let Err(e) = reporter.await {
        error!("Reporter task failed: {}", e);
    }
    match server.await {
        Ok(Err(e)) => error!("HTTP server error: {}", e),
        Err(e) => error!("HTTP server task failed: {}", e),
        Ok(Ok(())) => {}
    }

    let report = simulator.read().await.report();
    info!(
        applied = report.snapshots_applied,
        rejected = report.snapshots_rejected,
        reconnects = feed.reconnect_attempts(),
        "Shutdown complete"
    );

    if feed_ended {
        warn!("Order book feed ended before shutdown was requested");
        return Err(anyhow::anyhow!("order book feed ended"));
    }

    Ok(())
}
