//! Execution cost estimation against the current book.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::fees::FeeTier;
use super::impact::CostModel;
use crate::orderbook::{OrderBookState, Side};

/// The hypothetical order being costed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderParams {
    /// Order notional in quote currency (USD).
    pub quantity_usd: Decimal,
    /// Order direction.
    pub side: Side,
    /// Volatility as a fraction (0.02 = 2%).
    pub volatility: f64,
    /// Account fee tier.
    pub fee_tier: FeeTier,
}

impl Default for OrderParams {
    fn default() -> Self {
        Self {
            quantity_usd: dec!(100),
            side: Side::Buy,
            volatility: 0.02,
            fee_tier: FeeTier::Vip0,
        }
    }
}

/// Estimated share of the order filled passively vs aggressively, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExecutionSplit {
    /// Passive share.
    pub maker_pct: f64,
    /// Aggressive share.
    pub taker_pct: f64,
}

impl ExecutionSplit {
    /// Fully aggressive execution, assumed when there is nothing to judge against.
    pub const ALL_TAKER: ExecutionSplit = ExecutionSplit {
        maker_pct: 0.0,
        taker_pct: 100.0,
    };

    /// Logistic split from the ratio of top-of-book depth to order size.
    pub fn from_relative_size(relative_size: f64) -> Self {
        let taker_pct = 100.0 / (1.0 + (relative_size - 1.0).exp());
        Self {
            maker_pct: 100.0 - taker_pct,
            taker_pct,
        }
    }
}

/// Cost breakdown for one evaluation, all in percent of notional.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CostReport {
    /// Average fill price vs mid, positive when adverse.
    pub slippage_pct: f64,
    /// Maker/taker weighted fee.
    pub fee_pct: f64,
    /// Square-root impact estimate.
    pub market_impact_pct: f64,
    /// Passive share of the fill.
    pub maker_pct: f64,
    /// Aggressive share of the fill.
    pub taker_pct: f64,
    /// `slippage_pct + fee_pct + market_impact_pct`.
    pub net_cost_pct: f64,
}

/// Read-only cost calculations over a borrowed book.
#[derive(Debug, Clone, Copy)]
pub struct CostEstimator<'a> {
    book: &'a OrderBookState,
    model: &'a CostModel,
}

impl<'a> CostEstimator<'a> {
    /// Create an estimator over `book`.
    pub fn new(book: &'a OrderBookState, model: &'a CostModel) -> Self {
        Self { book, model }
    }

    /// Expected slippage for walking `quantity_usd` through the book on `side`.
    ///
    /// Zero when the book or the targeted side is empty.
    pub fn slippage_pct(&self, quantity_usd: Decimal, side: Side) -> f64 {
        let Some(mid_price) = self.book.mid_price() else {
            return 0.0;
        };
        let expected_price = self.book.liquidity_for(quantity_usd, side).average_price;
        if expected_price.is_zero() {
            return 0.0;
        }

        let (numerator, denominator) = match side {
            Side::Buy => (expected_price, mid_price),
            Side::Sell => (mid_price, expected_price),
        };
        match numerator
            .checked_div(denominator)
            .and_then(|ratio| (ratio - Decimal::ONE).checked_mul(Decimal::ONE_HUNDRED))
        {
            Some(pct) => pct.to_f64().unwrap_or(0.0),
            // Out of Decimal range; the f64 ratio is still meaningful.
            None => {
                let ratio = numerator.to_f64().unwrap_or(0.0) / denominator.to_f64().unwrap_or(1.0);
                (ratio - 1.0) * 100.0
            }
        }
    }

    /// Square-root market impact. Zero until at least one history sample exists.
    pub fn market_impact_pct(&self, quantity_usd: Decimal, volatility: f64) -> f64 {
        if self.book.history_len() == 0 {
            return 0.0;
        }
        let quantity = quantity_usd.to_f64().unwrap_or(0.0);
        let daily_volume = self.model.daily_volume_estimate(self.book);
        self.model.impact_pct(quantity, volatility, daily_volume)
    }

    /// Maker/taker split for an order of `quantity_usd`.
    pub fn maker_taker_split(&self, quantity_usd: Decimal) -> ExecutionSplit {
        let (Some(best_ask), Some(best_bid)) = (self.book.asks().first(), self.book.bids().first())
        else {
            return ExecutionSplit::ALL_TAKER;
        };
        if quantity_usd <= Decimal::ZERO {
            return ExecutionSplit::ALL_TAKER;
        }

        let top_notional = best_ask.notional().saturating_add(best_bid.notional());
        // A quotient beyond Decimal range means depth dwarfs the order.
        let relative_size = top_notional
            .checked_div(Decimal::TWO.saturating_mul(quantity_usd))
            .and_then(|ratio| ratio.to_f64())
            .unwrap_or(f64::MAX);
        ExecutionSplit::from_relative_size(relative_size)
    }

    /// Fee in percent for `tier`, weighted by `split`.
    pub fn fee_pct(&self, tier: FeeTier, split: ExecutionSplit) -> f64 {
        let rates = tier.rates();
        let maker_rate = rates.maker.to_f64().unwrap_or(0.0);
        let taker_rate = rates.taker.to_f64().unwrap_or(0.0);
        (split.maker_pct / 100.0 * maker_rate + split.taker_pct / 100.0 * taker_rate) * 100.0
    }

    /// Full cost breakdown for `order`.
    pub fn evaluate(&self, order: &OrderParams) -> CostReport {
        let slippage_pct = self.slippage_pct(order.quantity_usd, order.side);
        let split = self.maker_taker_split(order.quantity_usd);
        let fee_pct = self.fee_pct(order.fee_tier, split);
        let market_impact_pct = self.market_impact_pct(order.quantity_usd, order.volatility);

        CostReport {
            slippage_pct,
            fee_pct,
            market_impact_pct,
            maker_pct: split.maker_pct,
            taker_pct: split.taker_pct,
            net_cost_pct: slippage_pct + fee_pct + market_impact_pct,
        }
    }
}
