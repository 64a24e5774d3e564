//! Exchange clients
//!
//! Two venue adapters behind a common capability set: balance lookup, price
//! lookup and order placement. Each venue has its own request-signing scheme
//! and response shapes; everything else about them stays private.

mod bitmex;
mod kraken;

pub use bitmex::BitmexClient;
pub use kraken::KrakenClient;

use clap::ValueEnum;
use thiserror::Error;

use crate::types::Side;

/// Supported venues, selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExchangeKind {
    Kraken,
    Bitmex,
}

impl std::fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExchangeKind::Kraken => f.write_str("kraken"),
            ExchangeKind::Bitmex => f.write_str("bitmex"),
        }
    }
}

/// All venue failures normalize to this error; the raw response body travels
/// along for diagnostics. No retries happen at this layer.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("exchange request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("exchange request failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("exchange request failed: invalid api secret: {0}")]
    InvalidSecret(#[from] base64::DecodeError),

    #[error("exchange request failed: {context}: {body}")]
    Api { context: &'static str, body: String },
}

/// API key pair scoped to one client instance.
///
/// The secret must never reach the logs, so Debug redacts both fields.
#[derive(Clone)]
pub struct ExchangeCredentials {
    api_key: String,
    api_secret: String,
}

impl ExchangeCredentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        ExchangeCredentials {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }
}

impl std::fmt::Debug for ExchangeCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeCredentials")
            .field("api_key", &"***")
            .field("api_secret", &"***")
            .finish()
    }
}

/// Venue dispatch for the capability set
#[derive(Debug)]
pub enum ExchangeClient {
    Kraken(KrakenClient),
    Bitmex(BitmexClient),
}

impl ExchangeClient {
    pub fn new(kind: ExchangeKind, credentials: ExchangeCredentials) -> Self {
        match kind {
            ExchangeKind::Kraken => ExchangeClient::Kraken(KrakenClient::new(credentials)),
            ExchangeKind::Bitmex => ExchangeClient::Bitmex(BitmexClient::new(credentials)),
        }
    }

    pub async fn get_balance(&self, symbol: &str) -> Result<f64, ExchangeError> {
        match self {
            ExchangeClient::Kraken(client) => client.get_balance(symbol).await,
            ExchangeClient::Bitmex(client) => client.get_balance(symbol).await,
        }
    }

    pub async fn get_price(&self, symbol: &str) -> Result<f64, ExchangeError> {
        match self {
            ExchangeClient::Kraken(client) => client.get_price(symbol).await,
            ExchangeClient::Bitmex(client) => client.get_price(symbol).await,
        }
    }

    pub async fn place_order(
        &self,
        side: Side,
        size: f64,
        price: f64,
        symbol: &str,
    ) -> Result<(), ExchangeError> {
        match self {
            ExchangeClient::Kraken(client) => client.place_order(side, size, price, symbol).await,
            ExchangeClient::Bitmex(client) => client.place_order(side, size, price, symbol).await,
        }
    }
}

/// Kraken returns numeric fields as JSON strings; accept either shape
pub(crate) fn value_as_f64(value: &serde_json::Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}
