//! BitMEX REST client
//!
//! Private calls attach an expiry timestamp. The signature is HMAC-SHA256
//! over `verb || path || expires || body` with the plain API secret, sent as
//! a hex string in `api-signature` next to the raw key and the expiry.

use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use tracing::debug;

use super::{ExchangeCredentials, ExchangeError};
use crate::types::Side;

type HmacSha256 = Hmac<Sha256>;

const BASE_URL: &str = "https://testnet.bitmex.com";
const BALANCE_ENDPOINT: &str = "/api/v1/user/margin";
const TICKER_ENDPOINT: &str = "/api/v1/instrument";
const ORDER_ENDPOINT: &str = "/api/v1/order";

/// Margin figures arrive in satoshi minor units
const SATOSHI_PER_BTC: f64 = 100_000_000.0;

#[derive(Debug, Deserialize)]
struct MarginSummary {
    #[serde(rename = "availableMargin")]
    available_margin: f64,
}

#[derive(Debug, Deserialize)]
struct Instrument {
    #[serde(rename = "lastPrice")]
    last_price: f64,
}

#[derive(Debug, Serialize)]
struct OrderRequest<'a> {
    symbol: &'a str,
    side: &'static str,
    #[serde(rename = "orderQty")]
    order_qty: f64,
    price: f64,
    #[serde(rename = "ordType")]
    ord_type: &'static str,
}

#[derive(Debug)]
pub struct BitmexClient {
    credentials: ExchangeCredentials,
    client: reqwest::Client,
}

impl BitmexClient {
    pub fn new(credentials: ExchangeCredentials) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");
        BitmexClient {
            credentials,
            client,
        }
    }

    pub async fn get_balance(&self, symbol: &str) -> Result<f64, ExchangeError> {
        debug!("bitmex | get_account_balance: {symbol}");
        let text = self.request(Method::GET, BALANCE_ENDPOINT, None).await?;
        debug!("bitmex | get_account_balance: {text}");

        let margin: MarginSummary =
            serde_json::from_str(&text).map_err(|_| ExchangeError::Api {
                context: "get account balance",
                body: text,
            })?;
        Ok(margin.available_margin / SATOSHI_PER_BTC)
    }

    pub async fn get_price(&self, symbol: &str) -> Result<f64, ExchangeError> {
        debug!("bitmex | get_price: {symbol}");
        let endpoint = format!("{TICKER_ENDPOINT}?symbol={symbol}");
        let text = self.request(Method::GET, &endpoint, None).await?;
        debug!("bitmex | get_price: {text}");

        let instruments: Vec<Instrument> =
            serde_json::from_str(&text).map_err(|_| ExchangeError::Api {
                context: "get price",
                body: text.clone(),
            })?;
        instruments
            .first()
            .map(|instrument| instrument.last_price)
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
        let order = OrderRequest {
            symbol,
            side: match side {
                Side::Buy => "Buy",
                Side::Sell => "Sell",
            },
            order_qty: size,
            price,
            ord_type: "Limit",
        };
        let body = serde_json::to_string(&order)?;
        let text = self.request(Method::POST, ORDER_ENDPOINT, Some(body)).await?;

        serde_json::from_str::<serde_json::Value>(&text).map_err(|_| ExchangeError::Api {
            context: "place order",
            body: text,
        })?;
        Ok(())
    }

    /// Signed request; `endpoint` includes the query string, which is part of
    /// the signed message.
    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<String>,
    ) -> Result<String, ExchangeError> {
        let expires = Utc::now().timestamp_millis().to_string();
        let body = body.unwrap_or_default();
        let signature = sign_request(
            self.credentials.api_secret(),
            method.as_str(),
            endpoint,
            &expires,
            &body,
        );

        debug!("bitmex | api_request: {method} {endpoint}");

        let mut request = self
            .client
            .request(method.clone(), format!("{BASE_URL}{endpoint}"))
            .header("api-key", self.credentials.api_key())
            .header("api-expires", expires)
            .header("api-signature", signature);

        if method == Method::POST {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        Ok(request.send().await?.text().await?)
    }
}

fn sign_request(secret: &str, verb: &str, endpoint: &str, expires: &str, body: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(verb.as_bytes());
    mac.update(endpoint.as_bytes());
    mac.update(expires.as_bytes());
    mac.update(body.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
