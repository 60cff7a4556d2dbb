//! Parameter updates from the outside world.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cost::{FeeTier, OrderParams};
use crate::error::ParamsError;
use crate::orderbook::Side;

/// Partial update of the order parameters. Absent fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamsUpdate {
    /// New order notional in USD.
    #[serde(default)]
    pub quantity_usd: Option<Decimal>,
    /// New side, "buy" or "sell" (any case).
    #[serde(default)]
    pub side: Option<String>,
    /// New volatility fraction.
    #[serde(default)]
    pub volatility: Option<f64>,
    /// New fee tier label; unknown labels mean vip0.
    #[serde(default)]
    pub fee_tier: Option<String>,
}

impl ParamsUpdate {
    /// Produce the parameters that result from applying this update to `current`.
    pub fn apply_to(&self, current: &OrderParams) -> Result<OrderParams, ParamsError> {
        let mut next = current.clone();

        if let Some(quantity) = self.quantity_usd {
            next.quantity_usd = quantity;
        }
        if let Some(side) = &self.side {
            next.side = side
                .trim()
                .parse::<Side>()
                .map_err(|_| ParamsError::InvalidSide(side.clone()))?;
        }
        if let Some(volatility) = self.volatility {
            next.volatility = volatility;
        }
        if let Some(tier) = &self.fee_tier {
            next.fee_tier = FeeTier::from_label(tier);
        }

        validate(&next)?;
        Ok(next)
    }
}

/// Check that `params` can be evaluated.
pub fn validate(params: &OrderParams) -> Result<(), ParamsError> {
    if params.quantity_usd <= Decimal::ZERO {
        return Err(ParamsError::InvalidQuantity(params.quantity_usd));
    }
    if !params.volatility.is_finite() || params.volatility < 0.0 {
        return Err(ParamsError::InvalidVolatility(params.volatility));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn partial_update_keeps_other_fields() {
        let current = OrderParams::default();
        let update = ParamsUpdate {
            quantity_usd: Some(dec!(2500)),
            side: Some("SELL".to_string()),
            ..Default::default()
        };

        let next = update.apply_to(&current).unwrap();
        assert_eq!(next.quantity_usd, dec!(2500));
        assert_eq!(next.side, Side::Sell);
        assert_eq!(next.volatility, current.volatility);
        assert_eq!(next.fee_tier, current.fee_tier);
    }

    #[test]
    fn unknown_tier_maps_to_vip0() {
        let current = OrderParams {
            fee_tier: FeeTier::Vip4,
            ..OrderParams::default()
        };
        let update = ParamsUpdate {
            fee_tier: Some("diamond".to_string()),
            ..Default::default()
        };

        assert_eq!(update.apply_to(&current).unwrap().fee_tier, FeeTier::Vip0);
    }

    #[test]
    fn rejects_invalid_values() {
        let current = OrderParams::default();

        let zero_quantity = ParamsUpdate {
            quantity_usd: Some(Decimal::ZERO),
            ..Default::default()
        };
        assert_eq!(
            zero_quantity.apply_to(&current),
            Err(ParamsError::InvalidQuantity(Decimal::ZERO))
        );

        let negative_vol = ParamsUpdate {
            volatility: Some(-0.1),
            ..Default::default()
        };
        assert!(matches!(
            negative_vol.apply_to(&current),
            Err(ParamsError::InvalidVolatility(_))
        ));

        let bad_side = ParamsUpdate {
            side: Some("hold".to_string()),
            ..Default::default()
        };
        assert_eq!(
            bad_side.apply_to(&current),
            Err(ParamsError::InvalidSide("hold".to_string()))
        );
    }

    #[test]
    fn deserializes_from_json() {
        let update: ParamsUpdate =
            serde_json::from_str(r#"{"quantity_usd": "150", "fee_tier": "VIP2"}"#).unwrap();
        assert_eq!(update.quantity_usd, Some(dec!(150)));
        assert_eq!(update.fee_tier.as_deref(), Some("VIP2"));
        assert_eq!(update.side, None);
    }
}
