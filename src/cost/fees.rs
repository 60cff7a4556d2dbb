//! Exchange fee tiers.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tracing::debug;

/// Maker and taker fee rates as fractions of notional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeeRates {
    /// Rate charged on passive fills.
    pub maker: Decimal,
    /// Rate charged on aggressive fills.
    pub taker: Decimal,
}

/// Fee tier of the simulated account.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FeeTier {
    /// Entry tier.
    #[default]
    Vip0,
    Vip1,
    Vip2,
    Vip3,
    Vip4,
    /// Top tier, zero maker fee.
    Vip5,
}

impl FeeTier {
    /// Parse a tier label, falling back to [`FeeTier::Vip0`] for anything unknown.
    pub fn from_label(label: &str) -> Self {
        match label.trim().parse::<FeeTier>() {
            Ok(tier) => tier,
            Err(_) => {
                debug!(label = label, "Unknown fee tier, using vip0");
                FeeTier::Vip0
            }
        }
    }

    /// Maker/taker rates for this tier.
    pub fn rates(self) -> FeeRates {
        let (maker, taker) = match self {
            FeeTier::Vip0 => (dec!(0.0008), dec!(0.0010)),
            FeeTier::Vip1 => (dec!(0.0007), dec!(0.0009)),
            FeeTier::Vip2 => (dec!(0.0006), dec!(0.0008)),
            FeeTier::Vip3 => (dec!(0.0005), dec!(0.0007)),
            FeeTier::Vip4 => (dec!(0.0003), dec!(0.0005)),
            FeeTier::Vip5 => (dec!(0.0000), dec!(0.0003)),
        };
        FeeRates { maker, taker }
    }
}
