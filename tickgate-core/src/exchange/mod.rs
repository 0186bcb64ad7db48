//! Exchange adapters.
//!
//! Concrete implementations of the engine ports against a venue's REST API.
//! Adapters surface failures as [`ExchangeError`]; they never retry. The
//! decision loop logs the error and moves on to the next tick.

pub mod binance;

pub use binance::{sign_query, BinanceClient};

/// Errors from an exchange adapter.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExchangeError {
    #[error("network error: {0}")]
    Network(String),

    #[error("exchange returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("could not decode exchange response: {0}")]
    Decode(String),

    #[error("signed request without API credentials")]
    MissingCredentials,
}

impl ExchangeError {
    /// Venue error code carried in an API error body (`{"code":-4046,...}`).
    pub fn api_code(&self) -> Option<i64> {
        match self {
            ExchangeError::Api { body, .. } => serde_json::from_str::<serde_json::Value>(body)
                .ok()?
                .get("code")?
                .as_i64(),
            _ => None,
        }
    }
}
