//! Regime trader - main entry point
//!
//! This binary provides two subcommands:
//! - realtime: Trade live against Kraken or BitMEX
//! - backtest: Replay historical CSV data with simulated fills

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use regime_trader::exchange::ExchangeKind;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "regime-trader")]
#[command(about = "Regime-adaptive trading bot with live execution and backtesting", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Mirror logs to the console in addition to the log file
    #[arg(long, global = true)]
    log_to_console: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Trade live against an exchange
    Realtime {
        /// Exchange venue
        #[arg(short, long, value_enum)]
        exchange: ExchangeKind,

        /// Path to configuration file
        #[arg(short, long, default_value = "config.json")]
        config: String,

        /// Starting balance (otherwise restored from state or fetched live)
        #[arg(short, long)]
        balance: Option<f64>,

        /// Path of the persisted state file
        #[arg(long, default_value = "bot_state.json")]
        state_file: String,
    },

    /// Replay historical data with simulated fills
    Backtest {
        /// Exchange venue whose config section supplies the symbol
        #[arg(short, long, value_enum)]
        exchange: ExchangeKind,

        /// Path to configuration file
        #[arg(short, long, default_value = "config.json")]
        config: String,

        /// Historical data file (CSV with price, high, low columns)
        #[arg(short, long)]
        datafile: String,

        /// Starting balance
        #[arg(short, long)]
        balance: Option<f64>,
    },
}

fn setup_logging(verbose: bool, log_to_console: bool, command_name: &str) -> Result<()> {
    // Create logs directory
    std::fs::create_dir_all("logs")?;

    // Create log file with naming pattern: {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    // Set log level - filter out noisy external crates
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        level
    );
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    // File appender
    let file_appender = tracing_appender::rolling::never("logs", &log_filename);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    if log_to_console {
        let console_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(console_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    }

    info!("Logging initialized");
    info!("Log file: {}", log_path.display());

    Ok(())
}

fn main() -> Result<()> {
    // Credentials may come from a .env file instead of the config
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Realtime { .. } => "realtime",
        Commands::Backtest { .. } => "backtest",
    };

    setup_logging(cli.verbose, cli.log_to_console, command_name)?;

    match cli.command {
        Commands::Realtime {
            exchange,
            config,
            balance,
            state_file,
        } => commands::realtime::run(exchange, config, balance, state_file),

        Commands::Backtest {
            exchange,
            config,
            datafile,
            balance,
        } => commands::backtest::run(exchange, config, datafile, balance),
    }
}
