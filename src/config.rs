//! Application configuration loaded from environment variables.

use rust_decimal::Decimal;
use serde::Deserialize;
use url::Url;

use crate::cost::{CostModel, FeeTier, OrderParams};
use crate::error::ParamsError;
use crate::orderbook::{ReconnectConfig, Side};
use crate::simulator::params::validate as validate_params;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Market Feed ===
    /// L2 order book WebSocket endpoint.
    #[serde(default = "default_feed_ws_url")]
    pub feed_ws_url: String,

    /// Exchange label used until the first snapshot arrives.
    #[serde(default = "default_exchange")]
    pub exchange: String,

    /// Instrument label used until the first snapshot arrives.
    #[serde(default = "default_symbol")]
    pub symbol: String,

    // === Order Parameters ===
    /// Order notional in USD.
    #[serde(default = "default_order_quantity")]
    pub order_quantity_usd: Decimal,

    /// Order side, "buy" or "sell".
    #[serde(default = "default_order_side")]
    pub order_side: String,

    /// Volatility as a fraction (0.02 = 2%).
    #[serde(default = "default_volatility")]
    pub volatility: f64,

    /// Fee tier label (vip0..vip5). Unknown labels mean vip0.
    #[serde(default = "default_fee_tier")]
    pub fee_tier: String,

    // === Cost Model ===
    /// Assumed market cap for the daily volume fallback.
    #[serde(default = "default_fallback_market_cap")]
    pub fallback_market_cap: f64,

    /// Share of the market cap traded per day in the fallback.
    #[serde(default = "default_fallback_volume_fraction")]
    pub fallback_volume_fraction: f64,

    // === Reporting ===
    /// Milliseconds between published reports.
    #[serde(default = "default_report_interval")]
    pub report_interval_ms: u64,

    // === WebSocket Reconnection ===
    /// Consecutive failed connects before giving up (0 = never).
    #[serde(default = "default_ws_max_retries")]
    pub ws_max_retries: u32,

    /// Initial reconnect delay in milliseconds.
    #[serde(default = "default_ws_retry_delay")]
    pub ws_retry_delay_ms: u64,

    /// Maximum reconnect delay in seconds.
    #[serde(default = "default_ws_reconnect_max_delay")]
    pub ws_reconnect_max_delay_s: u64,

    // === Server Configuration ===
    /// HTTP server port for health/metrics endpoints.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_feed_ws_url() -> String {
    "wss://ws.gomarket-cpp.goquant.io/ws/l2-orderbook/okx/BTC-USDT-SWAP".to_string()
}

fn default_exchange() -> String {
    "OKX".to_string()
}

fn default_symbol() -> String {
    "BTC-USDT-SWAP".to_string()
}

fn default_order_quantity() -> Decimal {
    Decimal::new(100, 0) // $100
}

fn default_order_side() -> String {
    "buy".to_string()
}

fn default_volatility() -> f64 {
    0.02
}

fn default_fee_tier() -> String {
    "vip0".to_string()
}

fn default_fallback_market_cap() -> f64 {
    1e10
}

fn default_fallback_volume_fraction() -> f64 {
    0.05
}

fn default_report_interval() -> u64 {
    100
}

fn default_ws_max_retries() -> u32 {
    5
}

fn default_ws_retry_delay() -> u64 {
    2000
}

fn default_ws_reconnect_max_delay() -> u64 {
    30
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_ws_url: default_feed_ws_url(),
            exchange: default_exchange(),
            symbol: default_symbol(),
            order_quantity_usd: default_order_quantity(),
            order_side: default_order_side(),
            volatility: default_volatility(),
            fee_tier: default_fee_tier(),
            fallback_market_cap: default_fallback_market_cap(),
            fallback_volume_fraction: default_fallback_volume_fraction(),
            report_interval_ms: default_report_interval(),
            ws_max_retries: default_ws_max_retries(),
            ws_retry_delay_ms: default_ws_retry_delay(),
            ws_reconnect_max_delay_s: default_ws_reconnect_max_delay(),
            port: default_port(),
            rust_log: default_log_level(),
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        let url = Url::parse(&self.feed_ws_url)
            .map_err(|e| format!("FEED_WS_URL is not a valid URL: {e}"))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(format!(
                "FEED_WS_URL must use ws:// or wss://, got {}://",
                url.scheme()
            ));
        }

        self.order_params().map_err(|e| e.to_string())?;

        if self.report_interval_ms == 0 {
            return Err("REPORT_INTERVAL_MS must be greater than 0".to_string());
        }

        if !(self.fallback_market_cap.is_finite() && self.fallback_market_cap > 0.0) {
            return Err("FALLBACK_MARKET_CAP must be positive".to_string());
        }

        if !(self.fallback_volume_fraction > 0.0 && self.fallback_volume_fraction <= 1.0) {
            return Err("FALLBACK_VOLUME_FRACTION must be in (0, 1]".to_string());
        }

        Ok(())
    }

    /// Initial order parameters.
    pub fn order_params(&self) -> Result<OrderParams, ParamsError> {
        let side = self
            .order_side
            .trim()
            .parse::<Side>()
            .map_err(|_| ParamsError::InvalidSide(self.order_side.clone()))?;

        let params = OrderParams {
            quantity_usd: self.order_quantity_usd,
            side,
            volatility: self.volatility,
            fee_tier: FeeTier::from_label(&self.fee_tier),
        };
        validate_params(&params)?;
        Ok(params)
    }

    /// Cost model constants with the configured fallback.
    pub fn cost_model(&self) -> CostModel {
        CostModel {
            fallback_market_cap: self.fallback_market_cap,
            fallback_volume_fraction: self.fallback_volume_fraction,
            ..CostModel::default()
        }
    }

    /// Feed reconnection policy.
    pub fn reconnect_config(&self) -> ReconnectConfig {
        ReconnectConfig::from_config(
            self.ws_retry_delay_ms,
            self.ws_reconnect_max_delay_s,
            self.ws_max_retries,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_are_sensible() {
        assert_eq!(default_order_quantity(), Decimal::new(100, 0));
        assert_eq!(default_order_side(), "buy");
        assert_eq!(default_fee_tier(), "vip0");
        assert_eq!(default_report_interval(), 100);
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_non_websocket_url() {
        let config = Config {
            feed_ws_url: "https://example.com/book".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            feed_ws_url: "not a url".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_order_params() {
        let config = Config {
            order_quantity_usd: Decimal::ZERO,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            volatility: -0.5,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            order_side: "hold".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_model_and_cadence() {
        let config = Config {
            report_interval_ms: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            fallback_market_cap: 0.0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            fallback_volume_fraction: 1.5,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn derived_values_follow_config() {
        let config = Config {
            order_side: "Sell".to_string(),
            fee_tier: "VIP3".to_string(),
            fallback_market_cap: 2e9,
            ws_max_retries: 0,
            ..Config::default()
        };

        let params = config.order_params().unwrap();
        assert_eq!(params.side, Side::Sell);
        assert_eq!(params.fee_tier, FeeTier::Vip3);

        let model = config.cost_model();
        assert_eq!(model.fallback_market_cap, 2e9);
        assert_eq!(model.volume_lookback, CostModel::default().volume_lookback);

        let reconnect = config.reconnect_config();
        assert_eq!(reconnect.max_retries, 0);
        assert_eq!(reconnect.initial_delay_ms, 2000);
    }

    #[test]
    fn unknown_tier_falls_back_to_vip0() {
        let config = Config {
            fee_tier: "platinum".to_string(),
            ..Config::default()
        };
        assert_eq!(config.order_params().unwrap().fee_tier, FeeTier::Vip0);
    }
}
