//! Backtest command implementation

use anyhow::Result;
use regime_trader::bot::{TradingBot, BACKTEST_REFERENCE_BALANCE};
use regime_trader::data;
use regime_trader::exchange::{ExchangeClient, ExchangeCredentials, ExchangeKind};
use regime_trader::state::AccountState;
use regime_trader::BotConfig;
use std::path::PathBuf;
use tracing::info;

pub fn run(
    exchange: ExchangeKind,
    config_path: String,
    datafile: String,
    balance_override: Option<f64>,
) -> Result<()> {
    info!("Starting backtest against {exchange} configuration");

    let config = BotConfig::from_file(&config_path)?;
    info!("Loaded configuration from: {config_path}");

    let venue = config.venue(exchange)?.clone();
    let records = data::load_records(&datafile)?;

    // no requests are signed during a backtest; credentials ride along unused
    let credentials = ExchangeCredentials::new(venue.api_key, venue.api_secret);
    let client = ExchangeClient::new(exchange, credentials);

    let state = AccountState::fresh(balance_override.unwrap_or(BACKTEST_REFERENCE_BALANCE));
    let mut bot = TradingBot::new(
        &config,
        venue.symbol,
        client,
        state,
        PathBuf::from("bot_state.json"),
    );

    let summary = bot.run_backtest(&records);

    println!("\n{}", "=".repeat(60));
    println!("BACKTEST SUMMARY");
    println!("{}", "=".repeat(60));
    println!("Total Trades Executed:  {}", summary.total_trades);
    println!("Total Profit:           {:.2}", summary.net_profit);
    println!("Final Account Balance:  {:.2}", summary.final_balance);
    println!("{}", "=".repeat(60));

    Ok(())
}
