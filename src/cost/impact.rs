//! Square-root market impact model and its tunable constants.

use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::orderbook::OrderBookState;

/// Seconds per day; scales a per-tick volume to a daily estimate.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Constants of the cost model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    /// Near-touch samples averaged for the daily volume estimate.
    pub volume_lookback: usize,
    /// Assumed market cap when there is too little history.
    pub fallback_market_cap: f64,
    /// Share of `fallback_market_cap` used as daily volume.
    pub fallback_volume_fraction: f64,
    /// Volatility used when the caller supplies none.
    pub default_volatility: f64,
    /// Execution horizon as a fraction of a day.
    pub horizon_days: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            volume_lookback: 10,
            fallback_market_cap: 1e10,
            fallback_volume_fraction: 0.05,
            default_volatility: 0.02,
            horizon_days: 1.0 / SECONDS_PER_DAY,
        }
    }
}

impl CostModel {
    /// Daily volume used when history is too short.
    pub fn fallback_daily_volume(&self) -> f64 {
        self.fallback_market_cap * self.fallback_volume_fraction
    }

    /// Estimate daily volume from the recent near-touch volumes.
    pub fn daily_volume_estimate(&self, book: &OrderBookState) -> f64 {
        let lookback = self.volume_lookback.max(1);
        if book.history_len() < lookback {
            return self.fallback_daily_volume();
        }

        let total: f64 = book
            .recent_near_touch_volumes(lookback)
            .map(|v| v.to_f64().unwrap_or(0.0))
            .sum();
        let estimate = total / lookback as f64 * SECONDS_PER_DAY;

        if estimate.is_finite() && estimate > 0.0 {
            estimate
        } else {
            self.fallback_daily_volume()
        }
    }

    /// Volatility to use: the caller's if positive, otherwise the default.
    pub fn effective_volatility(&self, volatility: f64) -> f64 {
        if volatility.is_finite() && volatility > 0.0 {
            volatility
        } else {
            self.default_volatility
        }
    }

    /// Impact in percent: `sigma * sqrt(T) * sqrt(q / V) * 100`.
    pub fn impact_pct(&self, quantity_usd: f64, volatility: f64, daily_volume: f64) -> f64 {
        if quantity_usd <= 0.0 || daily_volume <= 0.0 {
            return 0.0;
        }
        let sigma = self.effective_volatility(volatility);
        sigma * self.horizon_days.sqrt() * (quantity_usd / daily_volume).sqrt() * 100.0
    }
}
