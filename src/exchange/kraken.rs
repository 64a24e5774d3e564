//! Kraken REST client
//!
//! Private calls attach a strictly increasing millisecond nonce. The request
//! signature is HMAC-SHA512 over `path || SHA256(nonce || body)`, keyed by
//! the base64-decoded API secret, and sent base64-encoded in the `API-Sign`
//! header alongside the raw key.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::{Digest, Sha256, Sha512};
use std::time::Duration;
use tracing::debug;
use url::form_urlencoded;

use super::{value_as_f64, ExchangeCredentials, ExchangeError};
use crate::types::Side;

type HmacSha512 = Hmac<Sha512>;

const BASE_URL: &str = "https://api.kraken.com";
const BALANCE_ENDPOINT: &str = "/0/private/Balance";
const TICKER_ENDPOINT: &str = "/0/public/Ticker";
const ORDER_ENDPOINT: &str = "/0/private/AddOrder";

#[derive(Debug)]
pub struct KrakenClient {
    credentials: ExchangeCredentials,
    client: reqwest::Client,
}

impl KrakenClient {
    pub fn new(credentials: ExchangeCredentials) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");
        KrakenClient {
            credentials,
            client,
        }
    }

    pub async fn get_balance(&self, symbol: &str) -> Result<f64, ExchangeError> {
        let value = self.private_post(BALANCE_ENDPOINT, &[]).await?;
        debug!("kraken | get_account_balance: {value}");

        // balances are keyed by currency code, e.g. "XBT" for "XBT/USD"
        let currency = symbol.split('/').next().unwrap_or(symbol);
        value
            .get("result")
            .and_then(|result| result.get(currency))
            .and_then(value_as_f64)
            .ok_or_else(|| ExchangeError::Api {
                context: "get account balance",
                body: value.to_string(),
            })
    }

    pub async fn get_price(&self, symbol: &str) -> Result<f64, ExchangeError> {
        debug!("kraken | get_price: {symbol}");
        let url = format!("{BASE_URL}{TICKER_ENDPOINT}?pair={symbol}");
        let text = self.client.get(&url).send().await?.text().await?;
        let value: Value = serde_json::from_str(&text).map_err(|_| ExchangeError::Api {
            context: "get price",
            body: text.clone(),
        })?;
        debug!("kraken | get_price: {value}");

        // last-trade field "c" is [price, lot volume]
        value
            .get("result")
            .and_then(|result| result.get(symbol))
            .and_then(|pair| pair.get("c"))
            .and_then(|closed| closed.get(0))
            .and_then(value_as_f64)
            .ok_or(ExchangeError::Api {
                context: "get price",
                body: text,
            })
    }

    pub async fn place_order(
        &self,
        side: Side,
        size: f64,
        price: f64,
        symbol: &str,
    ) -> Result<(), ExchangeError> {
        let params = [
            ("ordertype", "limit".to_string()),
            ("type", side.as_str().to_string()),
            ("volume", size.to_string()),
            ("pair", symbol.to_string()),
            ("price", price.to_string()),
        ];
        let value = self.private_post(ORDER_ENDPOINT, &params).await?;
        if value.get("result").is_some() {
            Ok(())
        } else {
            Err(ExchangeError::Api {
                context: "place order",
                body: value.to_string(),
            })
        }
    }

    async fn private_post(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Value, ExchangeError> {
        let nonce = Utc::now().timestamp_millis().to_string();

        let mut form = form_urlencoded::Serializer::new(String::new());
        for (key, value) in params {
            form.append_pair(key, value);
        }
        form.append_pair("nonce", &nonce);
        let body = form.finish();

        let signature = sign_request(self.credentials.api_secret(), endpoint, &nonce, &body)?;
        debug!("kraken | api_request: POST {endpoint}");

        let response = self
            .client
            .post(format!("{BASE_URL}{endpoint}"))
            .header("API-Key", self.credentials.api_key())
            .header("API-Sign", signature)
            .header("User-Agent", "regime-trader/0.1")
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body)
            .send()
            .await?;

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|_| ExchangeError::Api {
            context: "kraken response",
            body: text,
        })
    }
}

/// Compute the `API-Sign` header value.
///
/// `body` is the exact form-encoded payload that goes on the wire and already
/// contains the nonce pair.
fn sign_request(
    secret: &str,
    path: &str,
    nonce: &str,
    body: &str,
) -> Result<String, ExchangeError> {
    let mut hasher = Sha256::new();
    hasher.update(nonce.as_bytes());
    hasher.update(body.as_bytes());
    let digest = hasher.finalize();

    let key = BASE64.decode(secret)?;
    let mut mac = HmacSha512::new_from_slice(&key).expect("HMAC can take key of any size");
    mac.update(path.as_bytes());
    mac.update(&digest);

    Ok(BASE64.encode(mac.finalize().into_bytes()))
}
