/*
[INPUT]:  CLI arguments, JSON settings file, OS shutdown signals
[OUTPUT]: Market / account data printed as JSON, live stream output
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, subcommands, or shutdown handling
*/

mod commands;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use xeggex_adapter::{DEFAULT_SETTINGS_FILE, OrderStatus, XeggexClient};

#[derive(Parser, Debug)]
#[command(name = "xeggex", version, about = "XeggeX exchange command line client")]
struct Cli {
    /// JSON file with `access_key` and `secret_key`
    #[arg(long = "settings", value_name = "PATH", default_value = DEFAULT_SETTINGS_FILE)]
    settings_path: PathBuf,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Validate the settings file without touching the network
    Check,
    /// List assets
    Assets,
    /// List markets, or show one market
    Markets {
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Order book for a market
    Orderbook { symbol: String },
    /// Account balances
    Balances {
        /// Only assets with a non-zero balance
        #[arg(long)]
        nonzero: bool,
    },
    /// Own orders filtered by status
    Orders {
        #[arg(long, value_enum, default_value_t = StatusArg::Active)]
        status: StatusArg,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long, default_value_t = 100)]
        limit: u32,
    },
    /// Print live notifications until Ctrl-C
    Stream {
        #[arg(value_enum)]
        topic: TopicArg,
        /// Market symbol, e.g. XRG/USDT (not used for reports)
        symbol: Option<String>,
        /// Candle period in minutes
        #[arg(long, default_value_t = 5)]
        period: u32,
        #[arg(long)]
        limit: Option<u32>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum StatusArg {
    Active,
    Filled,
    Cancelled,
}

impl From<StatusArg> for OrderStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Active => OrderStatus::Active,
            StatusArg::Filled => OrderStatus::Filled,
            StatusArg::Cancelled => OrderStatus::Cancelled,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum TopicArg {
    Ticker,
    Orderbook,
    Trades,
    Candles,
    Reports,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args.log_level)?;

    info!(settings_path = %args.settings_path.display(), "starting xeggex");

    let client = XeggexClient::from_settings_file(&args.settings_path).context("create client")?;
    info!(authenticated = client.is_authenticated(), "client ready");

    match args.command {
        Command::Check => commands::check(&client),
        Command::Assets => commands::assets(&client).await,
        Command::Markets { symbol } => commands::markets(&client, symbol.as_deref()).await,
        Command::Orderbook { symbol } => commands::orderbook(&client, &symbol).await,
        Command::Balances { nonzero } => commands::balances(&client, nonzero).await,
        Command::Orders {
            status,
            symbol,
            limit,
        } => commands::orders(&client, status.into(), symbol.as_deref(), limit).await,
        Command::Stream {
            topic,
            symbol,
            period,
            limit,
        } => {
            let topic = commands::topic_from_args(topic, symbol, period, limit)?;
            let shutdown = CancellationToken::new();
            setup_signal_handlers(shutdown.clone());
            commands::stream(&client, topic, shutdown).await
        }
    }
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

fn setup_signal_handlers(shutdown: CancellationToken) {
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install SIGINT handler");
            return;
        }
        info!("received SIGINT");
        shutdown_clone.cancel();
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let shutdown_clone = shutdown.clone();
        tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                    info!("received SIGTERM");
                    shutdown_clone.cancel();
                }
                Err(err) => {
                    warn!(error = %err, "failed to install SIGTERM handler");
                }
            }
        });
    }
}
