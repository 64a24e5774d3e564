//! Realtime command implementation

use anyhow::{Context, Result};
use regime_trader::bot::TradingBot;
use regime_trader::exchange::{ExchangeClient, ExchangeCredentials, ExchangeKind};
use regime_trader::state::AccountState;
use regime_trader::BotConfig;
use std::path::PathBuf;
use tracing::info;

pub fn run(
    exchange: ExchangeKind,
    config_path: String,
    balance_override: Option<f64>,
    state_file: String,
) -> Result<()> {
    info!("Starting realtime trading on {exchange}");

    let config = BotConfig::from_file(&config_path)?;
    info!("Loaded configuration from: {config_path}");

    let venue = config.venue(exchange)?.clone();
    let credentials = ExchangeCredentials::new(venue.api_key, venue.api_secret);
    let client = ExchangeClient::new(exchange, credentials);

    let state_path = PathBuf::from(state_file);
    let restored = AccountState::load(&state_path)?;
    let starting_fresh = restored.is_none();
    let state = match restored {
        Some(state) => state,
        None => AccountState::fresh(balance_override.unwrap_or(0.0)),
    };

    let mut bot = TradingBot::new(&config, venue.symbol, client, state, state_path);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build async runtime")?;

    runtime.block_on(async {
        // a fresh start without an explicit balance trusts the exchange
        if starting_fresh && balance_override.is_none() {
            bot.init_balance_from_exchange()
                .await
                .context("Failed to fetch starting balance")?;
        }
        bot.run_realtime().await
    })
}
