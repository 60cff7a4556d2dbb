//! Order book types and snapshot validation.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::SnapshotError;

/// Single price level in an order book.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceLevel {
    /// Price at this level.
    pub price: Decimal,
    /// Quantity resting at this price (base units).
    pub quantity: Decimal,
}

impl PriceLevel {
    /// Create a new price level.
    pub fn new(price: Decimal, quantity: Decimal) -> Self {
        Self { price, quantity }
    }

    /// Quote-currency value of the level (`price * quantity`), saturating at
    /// `Decimal::MAX`.
    pub fn notional(&self) -> Decimal {
        self.price.saturating_mul(self.quantity)
    }
}

/// Direction of the hypothetical order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Side {
    /// Buy: lifts offers, consumes the ask side.
    #[default]
    Buy,
    /// Sell: hits bids, consumes the bid side.
    Sell,
}

/// Numeric field as it appears on the wire: feeds send decimal strings,
/// hand-written replay files often use bare numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    /// Decimal string, e.g. `"95445.5"`.
    Text(String),
    /// JSON number.
    Number(f64),
}

impl RawNumber {
    fn to_decimal(&self) -> Option<Decimal> {
        match self {
            RawNumber::Text(s) => {
                let s = s.trim();
                Decimal::from_str(s)
                    .or_else(|_| Decimal::from_scientific(s))
                    .ok()
            }
            RawNumber::Number(n) => Decimal::try_from(*n).ok(),
        }
    }

    fn display(&self) -> String {
        match self {
            RawNumber::Text(s) => s.clone(),
            RawNumber::Number(n) => n.to_string(),
        }
    }
}

impl From<&str> for RawNumber {
    fn from(value: &str) -> Self {
        RawNumber::Text(value.to_string())
    }
}

impl From<f64> for RawNumber {
    fn from(value: f64) -> Self {
        RawNumber::Number(value)
    }
}

/// One `[price, quantity, ...]` entry; extra trailing fields are ignored.
pub type RawLevel = Vec<RawNumber>;

/// Snapshot exactly as delivered by a feed, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSnapshot {
    /// Exchange identifier.
    #[serde(default)]
    pub exchange: Option<String>,
    /// Instrument symbol.
    #[serde(default)]
    pub symbol: Option<String>,
    /// RFC 3339 exchange timestamp.
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Ask levels in feed order.
    #[serde(default)]
    pub asks: Option<Vec<RawLevel>>,
    /// Bid levels in feed order.
    #[serde(default)]
    pub bids: Option<Vec<RawLevel>>,
}

/// Validated snapshot. Level order is still the feed's and is not trusted.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBookSnapshot {
    /// Exchange identifier.
    pub exchange: String,
    /// Instrument symbol.
    pub symbol: String,
    /// Exchange timestamp.
    pub timestamp: OffsetDateTime,
    /// Ask levels in feed order.
    pub asks: Vec<PriceLevel>,
    /// Bid levels in feed order.
    pub bids: Vec<PriceLevel>,
}

impl OrderBookSnapshot {
    /// Validate a raw snapshot.
    pub fn parse(raw: &RawSnapshot) -> Result<Self, SnapshotError> {
        let exchange = required_text(raw.exchange.as_deref(), "exchange")?;
        let symbol = required_text(raw.symbol.as_deref(), "symbol")?;
        let ts_text = required_text(raw.timestamp.as_deref(), "timestamp")?;
        let timestamp = parse_timestamp(&ts_text)?;

        let asks = raw.asks.as_ref().ok_or(SnapshotError::MissingField("asks"))?;
        let bids = raw.bids.as_ref().ok_or(SnapshotError::MissingField("bids"))?;

        Ok(Self {
            exchange,
            symbol,
            timestamp,
            asks: parse_levels(asks, "ask")?,
            bids: parse_levels(bids, "bid")?,
        })
    }
}

fn required_text(value: Option<&str>, field: &'static str) -> Result<String, SnapshotError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(SnapshotError::MissingField(field)),
    }
}

fn parse_timestamp(text: &str) -> Result<OffsetDateTime, SnapshotError> {
    OffsetDateTime::parse(text, &Rfc3339).map_err(|e| SnapshotError::InvalidTimestamp {
        value: text.to_string(),
        reason: e.to_string(),
    })
}

fn parse_levels(raw: &[RawLevel], side: &'static str) -> Result<Vec<PriceLevel>, SnapshotError> {
    raw.iter().map(|level| parse_level(level, side)).collect()
}

fn parse_level(raw: &RawLevel, side: &'static str) -> Result<PriceLevel, SnapshotError> {
    let price = parse_number(raw.first(), side, "price")?;
    let quantity = parse_number(raw.get(1), side, "quantity")?;

    if price <= Decimal::ZERO {
        return Err(SnapshotError::NonPositivePrice { side, price });
    }
    if quantity < Decimal::ZERO {
        return Err(SnapshotError::NegativeQuantity {
            side,
            price,
            quantity,
        });
    }

    Ok(PriceLevel::new(price, quantity))
}

fn parse_number(
    raw: Option<&RawNumber>,
    side: &'static str,
    field: &'static str,
) -> Result<Decimal, SnapshotError> {
    let raw = raw.ok_or_else(|| SnapshotError::InvalidNumber {
        side,
        field,
        value: String::new(),
    })?;
    raw.to_decimal().ok_or_else(|| SnapshotError::InvalidNumber {
        side,
        field,
        value: raw.display(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn level(price: &str, qty: &str) -> RawLevel {
        vec![price.into(), qty.into()]
    }

    fn raw() -> RawSnapshot {
        RawSnapshot {
            exchange: Some("OKX".to_string()),
            symbol: Some("BTC-USDT-SWAP".to_string()),
            timestamp: Some("2025-05-04T10:39:13Z".to_string()),
            asks: Some(vec![level("95445.5", "9.06"), level("95448", "2.05")]),
            bids: Some(vec![level("95445.4", "1104.23")]),
        }
    }

    #[test]
    fn price_level_notional() {
        let level = PriceLevel::new(dec!(100), dec!(2.5));
        assert_eq!(level.notional(), dec!(250));
    }

    #[test]
    fn price_level_notional_saturates() {
        let level = PriceLevel::new(dec!(1000000000000000), dec!(1000000000000000));
        assert_eq!(level.notional(), Decimal::MAX);
    }

    #[test]
    fn side_parses_case_insensitively() {
        assert_eq!("BUY".parse::<Side>().ok(), Some(Side::Buy));
        assert_eq!("sell".parse::<Side>().ok(), Some(Side::Sell));
        assert_eq!(Side::Sell.to_string(), "sell");
        assert!("hold".parse::<Side>().is_err());
    }

    #[test]
    fn parses_valid_snapshot() {
        let snapshot = OrderBookSnapshot::parse(&raw()).unwrap();

        assert_eq!(snapshot.exchange, "OKX");
        assert_eq!(snapshot.symbol, "BTC-USDT-SWAP");
        assert_eq!(snapshot.asks[0], PriceLevel::new(dec!(95445.5), dec!(9.06)));
        assert_eq!(snapshot.bids.len(), 1);
        assert_eq!(snapshot.timestamp.year(), 2025);
    }

    #[test]
    fn deserializes_wire_json_with_mixed_numbers() {
        let json = r#"{
            "timestamp": "2025-05-04T10:39:13.123Z",
            "exchange": "OKX",
            "symbol": "BTC-USDT-SWAP",
            "asks": [["100.5", "1", "0", "3"], [101, 2]],
            "bids": [["99.5", "4"]]
        }"#;
        let raw: RawSnapshot = serde_json::from_str(json).unwrap();
        let snapshot = OrderBookSnapshot::parse(&raw).unwrap();

        assert_eq!(snapshot.asks[0], PriceLevel::new(dec!(100.5), dec!(1)));
        assert_eq!(snapshot.asks[1], PriceLevel::new(dec!(101), dec!(2)));
    }

    #[test]
    fn rejects_missing_symbol() {
        let mut raw = raw();
        raw.symbol = None;
        assert_eq!(
            OrderBookSnapshot::parse(&raw),
            Err(SnapshotError::MissingField("symbol"))
        );

        let mut raw = self::raw();
        raw.exchange = Some("  ".to_string());
        assert_eq!(
            OrderBookSnapshot::parse(&raw),
            Err(SnapshotError::MissingField("exchange"))
        );
    }

    #[test]
    fn rejects_bad_timestamp() {
        let mut raw = raw();
        raw.timestamp = Some("yesterday".to_string());
        assert!(matches!(
            OrderBookSnapshot::parse(&raw),
            Err(SnapshotError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn rejects_non_numeric_levels() {
        let mut raw = raw();
        raw.bids = Some(vec![level("abc", "1")]);
        assert_eq!(
            OrderBookSnapshot::parse(&raw),
            Err(SnapshotError::InvalidNumber {
                side: "bid",
                field: "price",
                value: "abc".to_string(),
            })
        );

        let mut raw = self::raw();
        raw.asks = Some(vec![vec!["100".into()]]);
        assert!(matches!(
            OrderBookSnapshot::parse(&raw),
            Err(SnapshotError::InvalidNumber { field: "quantity", .. })
        ));
    }

    #[test]
    fn rejects_non_positive_price_and_negative_quantity() {
        let mut raw = raw();
        raw.asks = Some(vec![level("0", "1")]);
        assert!(matches!(
            OrderBookSnapshot::parse(&raw),
            Err(SnapshotError::NonPositivePrice { side: "ask", .. })
        ));

        let mut raw = self::raw();
        raw.bids = Some(vec![level("99", "-1")]);
        assert!(matches!(
            OrderBookSnapshot::parse(&raw),
            Err(SnapshotError::NegativeQuantity { side: "bid", .. })
        ));
    }

    #[test]
    fn empty_sides_are_valid() {
        let mut raw = raw();
        raw.asks = Some(vec![]);
        raw.bids = Some(vec![]);
        let snapshot = OrderBookSnapshot::parse(&raw).unwrap();
        assert!(snapshot.asks.is_empty() && snapshot.bids.is_empty());
    }
}
