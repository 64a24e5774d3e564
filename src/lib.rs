//! Regime Trader
//!
//! An automated trading bot that classifies the current market regime from
//! rolling technical indicators and trades it with a regime-specific rule,
//! either live against Kraken/BitMEX or replayed over historical data.

pub mod bot;
pub mod config;
pub mod data;
pub mod exchange;
pub mod indicators;
pub mod regime;
pub mod state;
pub mod strategy;
pub mod types;

pub use config::BotConfig;
pub use types::*;
