//! Engine configuration.
//!
//! One immutable [`EngineConfig`] loaded from TOML and passed into every
//! component at construction. Each section carries `#[serde(default)]`, so a
//! file only needs the keys it overrides. Credentials never live in the file:
//! they are read from the environment through [`Credentials::from_env`] and
//! [`TelegramCredentials::from_env`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_API_KEY: &str = "BINANCE_API_KEY";
pub const ENV_API_SECRET: &str = "BINANCE_API_SECRET";
pub const ENV_TELEGRAM_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),
}

// ─── Sections ────────────────────────────────────────────────────────

/// The traded instrument and its account-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    pub symbol: String,
    /// Decimal places the exchange accepts for order quantity.
    pub quantity_precision: u32,
    pub leverage: u32,
    pub margin_type: MarginType,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            symbol: "ETHUSDT".to_string(),
            quantity_precision: 3,
            leverage: 10,
            margin_type: MarginType::Isolated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarginType {
    Isolated,
    Crossed,
}

impl MarginType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarginType::Isolated => "ISOLATED",
            MarginType::Crossed => "CROSSED",
        }
    }
}

/// Entry, confirmation and regime timeframes, in exchange interval notation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeframeConfig {
    pub entry: String,
    pub mid: String,
    pub high: String,
    /// Candles requested per timeframe each tick (the last one is still forming).
    pub fetch_limit: usize,
}

impl Default for TimeframeConfig {
    fn default() -> Self {
        Self {
            entry: "5m".to_string(),
            mid: "15m".to_string(),
            high: "1h".to_string(),
            fetch_limit: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub ema_fast: usize,
    pub ema_slow: usize,
    /// EMA the entry close must sit above (long) or below (short).
    pub ema_entry_trend: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub atr_period: usize,
    pub adx_period: usize,
    pub bollinger_period: usize,
    pub bollinger_k: f64,
    pub volume_ma_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            ema_fast: 50,
            ema_slow: 200,
            ema_entry_trend: 50,
            rsi_period: 14,
            macd_fast: 8,
            macd_slow: 17,
            macd_signal: 5,
            atr_period: 14,
            adx_period: 14,
            bollinger_period: 20,
            bollinger_k: 2.0,
            volume_ma_period: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub adx_trend: f64,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub rsi_trend_long: f64,
    pub rsi_trend_short: f64,
    pub volume_factor_trend: f64,
    pub volume_factor_range: f64,
    /// Closed candles required on every timeframe before evaluating.
    pub min_candles: usize,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            adx_trend: 20.0,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            rsi_trend_long: 45.0,
            rsi_trend_short: 55.0,
            volume_factor_trend: 0.8,
            volume_factor_range: 0.5,
            min_candles: 60,
        }
    }
}

/// Momentum confirmation style for the trend branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyVariant {
    /// RSI and MACD histogram must cross their levels on the last closed candle.
    #[default]
    StrictCross,
    /// RSI and MACD histogram only need to sit on the right side of their levels.
    MomentumState,
}

impl StrategyVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyVariant::StrictCross => "strict_cross",
            StrategyVariant::MomentumState => "momentum_state",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub variant: StrategyVariant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityConfig {
    pub enabled: bool,
    pub max_relative_spread: f64,
    pub depth_levels: usize,
    /// Favoured side depth must be at least this multiple of the other side.
    pub depth_ratio: f64,
}

impl Default for LiquidityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_relative_spread: 0.0005,
            depth_levels: 20,
            depth_ratio: 0.9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Share of the quote balance committed (before leverage) per entry.
    pub trade_balance_fraction: f64,
    /// Fractional equity decline from the day's baseline that closes the gate.
    pub daily_drawdown_limit: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            trade_balance_fraction: 0.10,
            daily_drawdown_limit: 0.10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitStyle {
    /// Stop at a fixed percentage from entry, no take-profit.
    #[default]
    FixedPercent,
    /// ATR-scaled stop and take-profit.
    AtrBracket,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitConfig {
    pub style: ExitStyle,
    pub stop_loss_pct: f64,
    pub stop_atr_multiple: f64,
    pub take_profit_atr_multiple: f64,
    /// Close on a MACD histogram cross against the position.
    pub momentum_exit: bool,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            style: ExitStyle::FixedPercent,
            stop_loss_pct: 0.015,
            stop_atr_multiple: 1.5,
            take_profit_atr_multiple: 3.0,
            momentum_exit: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { interval_secs: 300 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Demo,
    Live,
}

impl Environment {
    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Demo => "https://demo-fapi.binance.com",
            Environment::Live => "https://fapi.binance.com",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub environment: Environment,
    pub recv_window_ms: u64,
    pub timeout_secs: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Demo,
            recv_window_ms: 5000,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub chat_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of trace, debug, info, warn, error.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ─── Root ────────────────────────────────────────────────────────────

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub instrument: InstrumentConfig,
    pub timeframes: TimeframeConfig,
    pub indicators: IndicatorConfig,
    pub thresholds: ThresholdConfig,
    pub strategy: StrategyConfig,
    pub liquidity: LiquidityConfig,
    pub risk: RiskConfig,
    pub exits: ExitConfig,
    pub schedule: ScheduleConfig,
    pub exchange: ExchangeConfig,
    pub telegram: TelegramConfig,
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load and validate a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Content hash of the canonical JSON rendering, stable across runs.
    pub fn fingerprint(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ind = &self.indicators;
        let th = &self.thresholds;

        if self.instrument.symbol.trim().is_empty() {
            return invalid("instrument.symbol must not be empty");
        }
        if self.instrument.quantity_precision > 8 {
            return invalid("instrument.quantity_precision must be <= 8");
        }
        if self.instrument.leverage == 0 {
            return invalid("instrument.leverage must be >= 1");
        }

        for (name, tf) in [
            ("timeframes.entry", &self.timeframes.entry),
            ("timeframes.mid", &self.timeframes.mid),
            ("timeframes.high", &self.timeframes.high),
        ] {
            if tf.trim().is_empty() {
                return invalid(format!("{name} must not be empty"));
            }
        }

        for (name, period) in [
            ("indicators.ema_fast", ind.ema_fast),
            ("indicators.ema_slow", ind.ema_slow),
            ("indicators.ema_entry_trend", ind.ema_entry_trend),
            ("indicators.rsi_period", ind.rsi_period),
            ("indicators.macd_fast", ind.macd_fast),
            ("indicators.macd_slow", ind.macd_slow),
            ("indicators.macd_signal", ind.macd_signal),
            ("indicators.atr_period", ind.atr_period),
            ("indicators.adx_period", ind.adx_period),
            ("indicators.volume_ma_period", ind.volume_ma_period),
        ] {
            if period == 0 {
                return invalid(format!("{name} must be >= 1"));
            }
        }
        if ind.bollinger_period < 2 {
            return invalid("indicators.bollinger_period must be >= 2");
        }
        if ind.ema_fast >= ind.ema_slow {
            return invalid("indicators.ema_fast must be < indicators.ema_slow");
        }
        if ind.macd_fast >= ind.macd_slow {
            return invalid("indicators.macd_fast must be < indicators.macd_slow");
        }
        if !(ind.bollinger_k > 0.0) {
            return invalid("indicators.bollinger_k must be > 0");
        }

        if th.min_candles < 2 {
            return invalid("thresholds.min_candles must be >= 2");
        }
        if self.timeframes.fetch_limit <= th.min_candles {
            return invalid("timeframes.fetch_limit must exceed thresholds.min_candles");
        }
        if !(0.0 < th.rsi_oversold && th.rsi_oversold < th.rsi_overbought && th.rsi_overbought < 100.0)
        {
            return invalid("rsi thresholds must satisfy 0 < oversold < overbought < 100");
        }
        for (name, level) in [
            ("thresholds.rsi_trend_long", th.rsi_trend_long),
            ("thresholds.rsi_trend_short", th.rsi_trend_short),
        ] {
            if !(0.0..=100.0).contains(&level) {
                return invalid(format!("{name} must be within [0, 100]"));
            }
        }
        for (name, factor) in [
            ("thresholds.volume_factor_trend", th.volume_factor_trend),
            ("thresholds.volume_factor_range", th.volume_factor_range),
            ("liquidity.depth_ratio", self.liquidity.depth_ratio),
            ("liquidity.max_relative_spread", self.liquidity.max_relative_spread),
            ("exits.stop_atr_multiple", self.exits.stop_atr_multiple),
            ("exits.take_profit_atr_multiple", self.exits.take_profit_atr_multiple),
        ] {
            if !(factor > 0.0) {
                return invalid(format!("{name} must be > 0"));
            }
        }
        if !th.adx_trend.is_finite() || th.adx_trend < 0.0 {
            return invalid("thresholds.adx_trend must be >= 0");
        }
        if self.liquidity.depth_levels == 0 {
            return invalid("liquidity.depth_levels must be >= 1");
        }

        for (name, fraction) in [
            ("risk.trade_balance_fraction", self.risk.trade_balance_fraction),
            ("risk.daily_drawdown_limit", self.risk.daily_drawdown_limit),
        ] {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return invalid(format!("{name} must be within (0, 1]"));
            }
        }
        if !(self.exits.stop_loss_pct > 0.0 && self.exits.stop_loss_pct < 1.0) {
            return invalid("exits.stop_loss_pct must be within (0, 1)");
        }

        if self.schedule.interval_secs == 0 {
            return invalid("schedule.interval_secs must be >= 1");
        }
        if self.exchange.timeout_secs == 0 {
            return invalid("exchange.timeout_secs must be >= 1");
        }
        let level = self.logging.level.to_ascii_lowercase();
        if !["trace", "debug", "info", "warn", "error"].contains(&level.as_str()) {
            return invalid(format!("logging.level {:?} is not a log level", self.logging.level));
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> Result<(), ConfigError> {
    Err(ConfigError::Invalid(message.into()))
}

// ─── Credentials ─────────────────────────────────────────────────────

/// Exchange API credentials.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: required_env(ENV_API_KEY)?,
            api_secret: required_env(ENV_API_SECRET)?,
        })
    }
}

/// Telegram bot token and destination chat.
#[derive(Clone)]
pub struct TelegramCredentials {
    pub bot_token: String,
    pub chat_id: String,
}

impl std::fmt::Debug for TelegramCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramCredentials")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

impl TelegramCredentials {
    /// Token from the environment; chat id from the environment, falling back
    /// to the config file.
    pub fn from_env(config: &TelegramConfig) -> Result<Self, ConfigError> {
        let bot_token = required_env(ENV_TELEGRAM_TOKEN)?;
        let chat_id = std::env::var(ENV_TELEGRAM_CHAT_ID)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| config.chat_id.clone());
        if chat_id.trim().is_empty() {
            return Err(ConfigError::MissingEnv(ENV_TELEGRAM_CHAT_ID));
        }
        Ok(Self { bot_token, chat_id })
    }
}

fn required_env(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingEnv(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn empty_file_yields_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.instrument.symbol, "ETHUSDT");
        assert_eq!(config.indicators.macd_fast, 8);
        assert_eq!(config.timeframes.high, "1h");
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [strategy]
            variant = "momentum_state"

            [exits]
            style = "atr_bracket"
            "#,
        )
        .unwrap();
        assert_eq!(config.strategy.variant, StrategyVariant::MomentumState);
        assert_eq!(config.exits.style, ExitStyle::AtrBracket);
        assert_eq!(config.exits.stop_atr_multiple, 1.5);
        assert_eq!(config.risk.daily_drawdown_limit, 0.10);
    }

    #[test]
    fn rejects_inverted_ema_pair() {
        let err = EngineConfig::from_toml_str("[indicators]\nema_fast = 200\nema_slow = 50\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("ema_fast")));
    }

    #[test]
    fn rejects_zero_period_and_interval() {
        let mut config = EngineConfig::default();
        config.indicators.rsi_period = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.schedule.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_fraction_out_of_range() {
        let mut config = EngineConfig::default();
        config.risk.trade_balance_fraction = 1.5;
        assert!(config.validate().is_err());

        config.risk.trade_balance_fraction = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_unknown_log_level() {
        let err = EngineConfig::from_toml_str("[logging]\nlevel = \"loud\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("logging.level")));
        assert!(EngineConfig::from_toml_str("[logging]\nlevel = \"DEBUG\"\n").is_ok());
    }

    #[test]
    fn rejects_unknown_variant() {
        let err = EngineConfig::from_toml_str("[strategy]\nvariant = \"yolo\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn fingerprint_is_deterministic_and_sensitive() {
        let a = EngineConfig::default();
        let mut b = EngineConfig::default();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        assert_eq!(a.fingerprint().unwrap().len(), 64);

        b.thresholds.adx_trend = 25.0;
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }

    #[test]
    fn environment_base_urls() {
        assert_eq!(Environment::Demo.base_url(), "https://demo-fapi.binance.com");
        assert_eq!(Environment::Live.base_url(), "https://fapi.binance.com");
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let creds = Credentials {
            api_key: "key-123".into(),
            api_secret: "secret-456".into(),
        };
        let shown = format!("{creds:?}");
        assert!(!shown.contains("key-123"));
        assert!(!shown.contains("secret-456"));
    }
}
