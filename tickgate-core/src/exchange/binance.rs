//! Binance USDⓈ-M futures REST client.
//!
//! Blocking `reqwest` client for the handful of endpoints the engine needs.
//! Signed endpoints append `recvWindow`, `timestamp` and a hex HMAC-SHA256
//! `signature` of the query string, and carry the `X-MBX-APIKEY` header.
//! Numeric fields arrive as strings and are decoded here, so nothing past
//! this module sees raw JSON.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::ExchangeError;
use crate::config::{Credentials, EngineConfig, InstrumentConfig, MarginType};
use crate::domain::{Candle, DepthLevel, MarketOrder, OrderAck, OrderBookDepth, Position};
use crate::engine::ports::{Account, MarketData, OrderExecutor};

/// "No need to change margin type."
const MARGIN_TYPE_UNCHANGED: i64 = -4046;

/// Depth limits the endpoint accepts.
const DEPTH_LIMITS: [usize; 7] = [5, 10, 20, 50, 100, 500, 1000];

// ─── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct DepthResponse {
    bids: Vec<[String; 2]>,
    asks: Vec<[String; 2]>,
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    total_wallet_balance: String,
    #[serde(default)]
    assets: Vec<AssetBalance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetBalance {
    asset: String,
    wallet_balance: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PositionRisk {
    symbol: String,
    position_amt: String,
    entry_price: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    order_id: u64,
    status: String,
    executed_qty: String,
}

// ─── Client ──────────────────────────────────────────────────────────

pub struct BinanceClient {
    http: reqwest::blocking::Client,
    base_url: String,
    symbol: String,
    quantity_precision: u32,
    recv_window_ms: u64,
    credentials: Option<Credentials>,
}

impl BinanceClient {
    /// Client for the configured environment and symbol. Without credentials
    /// only public market-data endpoints work.
    pub fn new(config: &EngineConfig, credentials: Option<Credentials>) -> Result<Self, ExchangeError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.exchange.timeout_secs))
            .build()
            .map_err(|e| ExchangeError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.exchange.environment.base_url().to_string(),
            symbol: config.instrument.symbol.clone(),
            quantity_precision: config.instrument.quantity_precision,
            recv_window_ms: config.exchange.recv_window_ms,
            credentials,
        })
    }

    /// Point the client at another host (e.g. a local stub).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    // ── Public endpoints ──

    /// Raw klines, oldest first. The last one is still forming.
    pub fn klines(&self, interval: &str, limit: usize) -> Result<Vec<Candle>, ExchangeError> {
        let body = self.public_get(
            "/fapi/v1/klines",
            &[
                ("symbol", self.symbol.clone()),
                ("interval", interval.to_string()),
                ("limit", limit.to_string()),
            ],
        )?;
        decode_klines(&body)
    }

    /// Order book truncated to `levels` per side.
    pub fn order_book(&self, levels: usize) -> Result<OrderBookDepth, ExchangeError> {
        let body = self.public_get(
            "/fapi/v1/depth",
            &[
                ("symbol", self.symbol.clone()),
                ("limit", depth_limit(levels).to_string()),
            ],
        )?;
        let mut book = decode_depth(&body)?;
        book.bids.truncate(levels);
        book.asks.truncate(levels);
        Ok(book)
    }

    /// Last traded price, used as the mark price.
    pub fn ticker_price(&self) -> Result<f64, ExchangeError> {
        let body = self.public_get("/fapi/v1/ticker/price", &[("symbol", self.symbol.clone())])?;
        let ticker: TickerPrice = decode(&body)?;
        parse_number(&ticker.price, "price")
    }

    // ── Signed endpoints ──

    /// `(totalWalletBalance, USDT walletBalance)`.
    pub fn wallet(&self) -> Result<(f64, f64), ExchangeError> {
        let body = self.signed(reqwest::Method::GET, "/fapi/v2/account", &[])?;
        decode_account(&body, "USDT")
    }

    /// The configured symbol's open position, if any.
    pub fn position(&self) -> Result<Option<Position>, ExchangeError> {
        let body = self.signed(reqwest::Method::GET, "/fapi/v2/positionRisk", &[])?;
        decode_position(&body, &self.symbol)
    }

    pub fn place_market_order(&self, order: &MarketOrder) -> Result<OrderAck, ExchangeError> {
        let mut params = vec![
            ("symbol", order.symbol.clone()),
            ("side", order.side.as_str().to_string()),
            ("type", "MARKET".to_string()),
            (
                "quantity",
                format!("{:.*}", self.quantity_precision as usize, order.quantity),
            ),
        ];
        if order.reduce_only {
            params.push(("reduceOnly", "true".to_string()));
        }
        info!(
            side = %order.side,
            quantity = order.quantity,
            reduce_only = order.reduce_only,
            "submitting market order"
        );
        let body = self.signed(reqwest::Method::POST, "/fapi/v1/order", &params)?;
        decode_order_ack(&body)
    }

    /// Set the margin type; "already set" counts as success.
    pub fn set_margin_type(&self, margin_type: MarginType) -> Result<(), ExchangeError> {
        let result = self.signed(
            reqwest::Method::POST,
            "/fapi/v1/marginType",
            &[
                ("symbol", self.symbol.clone()),
                ("marginType", margin_type.as_str().to_string()),
            ],
        );
        match result {
            Ok(_) => {
                info!(margin_type = margin_type.as_str(), "margin type set");
                Ok(())
            }
            Err(err) if err.api_code() == Some(MARGIN_TYPE_UNCHANGED) => {
                debug!(margin_type = margin_type.as_str(), "margin type already set");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    pub fn set_leverage(&self, leverage: u32) -> Result<(), ExchangeError> {
        self.signed(
            reqwest::Method::POST,
            "/fapi/v1/leverage",
            &[
                ("symbol", self.symbol.clone()),
                ("leverage", leverage.to_string()),
            ],
        )?;
        info!(leverage, "leverage set");
        Ok(())
    }

    /// Apply margin type and leverage. Failures are logged, not fatal: the
    /// account keeps whatever it had.
    pub fn prepare_account(&self, instrument: &InstrumentConfig) {
        if let Err(err) = self.set_margin_type(instrument.margin_type) {
            warn!(error = %err, "could not set margin type");
        }
        if let Err(err) = self.set_leverage(instrument.leverage) {
            warn!(error = %err, "could not set leverage");
        }
    }

    // ── Transport ──

    fn public_get(&self, path: &str, params: &[(&str, String)]) -> Result<String, ExchangeError> {
        let url = format!("{}{}?{}", self.base_url, path, encode_query(params));
        debug!(path, "GET");
        self.send(self.http.get(url))
    }

    fn signed(
        &self,
        method: reqwest::Method,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<String, ExchangeError> {
        let creds = self
            .credentials
            .as_ref()
            .ok_or(ExchangeError::MissingCredentials)?;

        let mut query = encode_query(params);
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str(&format!(
            "recvWindow={}&timestamp={}",
            self.recv_window_ms,
            Utc::now().timestamp_millis()
        ));
        let signature = sign_query(&creds.api_secret, &query);
        let url = format!("{}{}?{}&signature={}", self.base_url, path, query, signature);

        debug!(%method, path, "signed request");
        self.send(
            self.http
                .request(method, url)
                .header("X-MBX-APIKEY", creds.api_key.as_str()),
        )
    }

    fn send(&self, request: reqwest::blocking::RequestBuilder) -> Result<String, ExchangeError> {
        let response = request
            .send()
            .map_err(|e| ExchangeError::Network(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| ExchangeError::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(ExchangeError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

impl MarketData for BinanceClient {
    fn candles(&self, timeframe: &str, count: usize) -> Result<Vec<Candle>, ExchangeError> {
        self.klines(timeframe, count)
    }

    fn mark_price(&self) -> Result<f64, ExchangeError> {
        self.ticker_price()
    }

    fn depth(&self, levels: usize) -> Result<OrderBookDepth, ExchangeError> {
        self.order_book(levels)
    }
}

impl Account for BinanceClient {
    fn equity_and_balance(&self) -> Result<(f64, f64), ExchangeError> {
        self.wallet()
    }

    fn open_position(&self) -> Result<Option<Position>, ExchangeError> {
        self.position()
    }
}

impl OrderExecutor for BinanceClient {
    fn submit_market_order(&self, order: &MarketOrder) -> Result<OrderAck, ExchangeError> {
        self.place_market_order(order)
    }
}

// ─── Encoding / decoding ─────────────────────────────────────────────

/// Hex HMAC-SHA256 of `query` keyed by `secret`.
pub fn sign_query(secret: &str, query: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(query.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// `k1=v1&k2=v2` in the given order. Values are symbols, enums and numbers,
/// none of which need escaping.
fn encode_query(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Smallest accepted depth limit covering `levels`.
fn depth_limit(levels: usize) -> usize {
    DEPTH_LIMITS
        .iter()
        .copied()
        .find(|&limit| limit >= levels)
        .unwrap_or(1000)
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ExchangeError> {
    serde_json::from_str(body).map_err(|e| ExchangeError::Decode(e.to_string()))
}

fn parse_number(raw: &str, field: &str) -> Result<f64, ExchangeError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ExchangeError::Decode(format!("{field}: not a number: {raw:?}")))
}

fn value_number(value: &Value, field: &str) -> Result<f64, ExchangeError> {
    match value {
        Value::String(s) => parse_number(s, field),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ExchangeError::Decode(format!("{field}: out of range"))),
        other => Err(ExchangeError::Decode(format!("{field}: unexpected {other}"))),
    }
}

/// Decode kline rows `[openTime, open, high, low, close, volume, ...]`.
pub fn decode_klines(body: &str) -> Result<Vec<Candle>, ExchangeError> {
    let rows: Vec<Vec<Value>> = decode(body)?;
    rows.iter().map(|row| decode_kline_row(row)).collect()
}

fn decode_kline_row(row: &[Value]) -> Result<Candle, ExchangeError> {
    if row.len() < 6 {
        return Err(ExchangeError::Decode(format!(
            "kline row has {} fields, need 6",
            row.len()
        )));
    }
    let open_ms = row[0]
        .as_i64()
        .ok_or_else(|| ExchangeError::Decode("kline open time is not an integer".into()))?;
    let open_time = DateTime::<Utc>::from_timestamp_millis(open_ms)
        .ok_or_else(|| ExchangeError::Decode(format!("kline open time out of range: {open_ms}")))?;

    let candle = Candle {
        open_time,
        open: value_number(&row[1], "open")?,
        high: value_number(&row[2], "high")?,
        low: value_number(&row[3], "low")?,
        close: value_number(&row[4], "close")?,
        volume: value_number(&row[5], "volume")?,
    };
    if !candle.is_sane() {
        return Err(ExchangeError::Decode(format!(
            "kline at {open_ms} has inconsistent OHLCV"
        )));
    }
    Ok(candle)
}

pub fn decode_depth(body: &str) -> Result<OrderBookDepth, ExchangeError> {
    let raw: DepthResponse = decode(body)?;
    let levels = |side: &[[String; 2]]| -> Result<Vec<DepthLevel>, ExchangeError> {
        side.iter()
            .map(|[price, size]| {
                Ok(DepthLevel {
                    price: parse_number(price, "depth price")?,
                    size: parse_number(size, "depth size")?,
                })
            })
            .collect()
    };
    Ok(OrderBookDepth {
        bids: levels(&raw.bids)?,
        asks: levels(&raw.asks)?,
    })
}

/// `(total wallet balance, quote asset wallet balance)`; a missing quote
/// asset counts as zero balance.
pub fn decode_account(body: &str, quote_asset: &str) -> Result<(f64, f64), ExchangeError> {
    let account: AccountResponse = decode(body)?;
    let equity = parse_number(&account.total_wallet_balance, "totalWalletBalance")?;
    let balance = match account.assets.iter().find(|a| a.asset == quote_asset) {
        Some(asset) => parse_number(&asset.wallet_balance, "walletBalance")?,
        None => 0.0,
    };
    Ok((equity, balance))
}

/// The non-zero position for `symbol`; the sign of `positionAmt` gives the side.
pub fn decode_position(body: &str, symbol: &str) -> Result<Option<Position>, ExchangeError> {
    let entries: Vec<PositionRisk> = decode(body)?;
    for entry in entries.iter().filter(|p| p.symbol == symbol) {
        let amount = parse_number(&entry.position_amt, "positionAmt")?;
        let entry_price = parse_number(&entry.entry_price, "entryPrice")?;
        if let Some(position) = Position::from_signed(amount, entry_price) {
            return Ok(Some(position));
        }
    }
    Ok(None)
}

pub fn decode_order_ack(body: &str) -> Result<OrderAck, ExchangeError> {
    let raw: OrderResponse = decode(body)?;
    Ok(OrderAck {
        order_id: raw.order_id,
        status: raw.status,
        executed_qty: parse_number(&raw.executed_qty, "executedQty")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Side;

    #[test]
    fn signature_matches_documented_example() {
        let secret = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";
        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1\
                     &recvWindow=5000&timestamp=1499827319559";
        assert_eq!(
            sign_query(secret, query),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn query_keeps_parameter_order() {
        let q = encode_query(&[("symbol", "ETHUSDT".into()), ("limit", "20".into())]);
        assert_eq!(q, "symbol=ETHUSDT&limit=20");
        assert_eq!(encode_query(&[]), "");
    }

    #[test]
    fn depth_limit_rounds_up_to_accepted_value() {
        assert_eq!(depth_limit(1), 5);
        assert_eq!(depth_limit(20), 20);
        assert_eq!(depth_limit(21), 50);
        assert_eq!(depth_limit(5000), 1000);
    }

    #[test]
    fn klines_decode_positionally() {
        let body = r#"[
            [1499040000000, "0.01634790", "0.80000000", "0.01575800", "0.01577100",
             "148976.11427815", 1499644799999, "2434.19055334", 308, "1756.87402397",
             "28.46694368", "0"],
            [1499040300000, "0.01577100", "0.01600000", "0.01570000", "0.01590000",
             "1000.5", 1499644799999, "0", 1, "0", "0", "0"]
        ]"#;
        let candles = decode_klines(body).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].open_time.timestamp_millis(), 1499040000000);
        assert_eq!(candles[0].open, 0.0163479);
        assert_eq!(candles[0].high, 0.8);
        assert_eq!(candles[0].close, 0.015771);
        assert_eq!(candles[0].volume, 148976.11427815);
        assert_eq!(candles[1].volume, 1000.5);
    }

    #[test]
    fn short_kline_row_is_decode_error() {
        let err = decode_klines(r#"[[1499040000000, "1.0", "2.0"]]"#).unwrap_err();
        assert!(matches!(err, ExchangeError::Decode(_)));
    }

    #[test]
    fn inconsistent_kline_is_decode_error() {
        // high below low
        let body = r#"[[1499040000000, "10.0", "9.0", "9.5", "9.8", "1.0"]]"#;
        match decode_klines(body).unwrap_err() {
            ExchangeError::Decode(message) => assert!(message.contains("1499040000000"), "{message}"),
            other => panic!("expected decode error, got {other:?}"),
        }

        let negative_volume = r#"[[1499040000000, "10.0", "11.0", "9.5", "10.5", "-1"]]"#;
        assert!(matches!(
            decode_klines(negative_volume),
            Err(ExchangeError::Decode(_))
        ));
    }

    #[test]
    fn depth_decodes_string_levels() {
        let body = r#"{"lastUpdateId":1027024,"E":1589436922972,"T":1589436922959,
            "bids":[["4.00000000","431.00000000"]],
            "asks":[["4.00000200","12.00000000"],["4.5","1"]]}"#;
        let book = decode_depth(body).unwrap();
        assert_eq!(book.best_bid(), Some(4.0));
        assert_eq!(book.asks.len(), 2);
        assert_eq!(book.ask_depth(20), 13.0);
    }

    #[test]
    fn account_reads_equity_and_usdt_balance() {
        let body = r#"{"totalWalletBalance":"1250.50","assets":[
            {"asset":"BTC","walletBalance":"0.1"},
            {"asset":"USDT","walletBalance":"1200.25"}]}"#;
        assert_eq!(decode_account(body, "USDT").unwrap(), (1250.5, 1200.25));

        let no_usdt = r#"{"totalWalletBalance":"10","assets":[]}"#;
        assert_eq!(decode_account(no_usdt, "USDT").unwrap(), (10.0, 0.0));
    }

    #[test]
    fn position_sign_gives_side() {
        let body = r#"[
            {"symbol":"BTCUSDT","positionAmt":"1.0","entryPrice":"60000"},
            {"symbol":"ETHUSDT","positionAmt":"-0.050","entryPrice":"2000.5"}
        ]"#;
        let pos = decode_position(body, "ETHUSDT").unwrap().unwrap();
        assert_eq!(pos.side, Side::Short);
        assert_eq!(pos.quantity, 0.05);
        assert_eq!(pos.entry_price, 2000.5);
    }

    #[test]
    fn flat_position_is_none() {
        let body = r#"[{"symbol":"ETHUSDT","positionAmt":"0.000","entryPrice":"0.0"}]"#;
        assert_eq!(decode_position(body, "ETHUSDT").unwrap(), None);
    }

    #[test]
    fn order_ack_decodes() {
        let body = r#"{"orderId":22542179,"symbol":"ETHUSDT","status":"FILLED",
            "executedQty":"0.050","side":"BUY","type":"MARKET"}"#;
        let ack = decode_order_ack(body).unwrap();
        assert_eq!(ack.order_id, 22542179);
        assert_eq!(ack.status, "FILLED");
        assert_eq!(ack.executed_qty, 0.05);
    }

    #[test]
    fn signed_request_without_credentials_fails_fast() {
        let client = BinanceClient::new(&EngineConfig::default(), None).unwrap();
        assert_eq!(client.wallet().unwrap_err(), ExchangeError::MissingCredentials);
    }
}
