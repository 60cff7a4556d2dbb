//! Walk-the-book pricing for a hypothetical notional amount.

use rust_decimal::Decimal;

use super::types::PriceLevel;

/// Result of walking one side of the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Liquidity {
    /// Volume-weighted average execution price, zero when nothing executed.
    pub average_price: Decimal,
    /// Base quantity executed.
    pub executed_quantity: Decimal,
    /// Quote notional that could not be placed against visible depth.
    pub unfilled_notional: Decimal,
}

impl Liquidity {
    /// Whether any quantity could be priced.
    pub fn is_empty(&self) -> bool {
        self.executed_quantity.is_zero()
    }

    /// Whether the full notional was absorbed.
    pub fn is_complete(&self) -> bool {
        self.unfilled_notional <= Decimal::ZERO
    }
}

/// Price a `notional` quote-currency order against `levels`, best price first.
///
/// Never fails: an empty side yields an all-zero result and thin depth
/// yields a partial fill with a non-zero `unfilled_notional`. Sums saturate
/// at `Decimal::MAX` instead of overflowing.
pub fn liquidity_for(levels: &[PriceLevel], notional: Decimal) -> Liquidity {
    let mut remaining = notional.max(Decimal::ZERO);
    let mut executed_quantity = Decimal::ZERO;
    let mut total_cost = Decimal::ZERO;

    for level in levels {
        if remaining <= Decimal::ZERO {
            break;
        }

        let take_notional = remaining.min(level.notional());
        let Some(take_quantity) = take_notional.checked_div(level.price) else {
            break;
        };

        total_cost = total_cost.saturating_add(take_quantity.saturating_mul(level.price));
        executed_quantity = executed_quantity.saturating_add(take_quantity);
        remaining -= take_notional;
    }

    // Nothing executed: the division by zero yields `None`.
    let Some(average_price) = total_cost.checked_div(executed_quantity) else {
        return Liquidity {
            unfilled_notional: remaining,
            ..Liquidity::default()
        };
    };

    Liquidity {
        average_price,
        executed_quantity,
        unfilled_notional: remaining,
    }
}
