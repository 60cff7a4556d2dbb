//! Current two-sided book plus bounded history derived from it.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use time::OffsetDateTime;
use tracing::{debug, instrument};

use super::types::{OrderBookSnapshot, PriceLevel, RawSnapshot, Side};
use super::walker::{liquidity_for, Liquidity};
use crate::error::SnapshotError;
use crate::window::RollingWindow;

/// Maximum levels kept per side.
pub const MAX_BOOK_DEPTH: usize = 50;

/// Maximum history samples retained.
pub const HISTORY_CAPACITY: usize = 300;

/// Half-width of the near-touch band as a fraction of mid price (0.1%).
pub const NEAR_TOUCH_BAND: Decimal = dec!(0.001);

/// One history point. Mid price, spread and near-touch volume are recorded
/// together so the three series can never drift apart in length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookSample {
    /// Local time the update was applied.
    pub at: OffsetDateTime,
    /// `(best_ask + best_bid) / 2`.
    pub mid_price: Decimal,
    /// `best_ask - best_bid`.
    pub spread: Decimal,
    /// Quantity resting within the near-touch band on both sides.
    pub near_touch_volume: Decimal,
}

/// Single-instrument order book state.
///
/// Owned by one writer. Every mutation goes through [`OrderBookState::update`]
/// (or [`OrderBookState::apply`]), which either replaces the book and appends
/// one history sample, or fails before touching anything.
#[derive(Debug, Clone)]
pub struct OrderBookState {
    asks: Vec<PriceLevel>,
    bids: Vec<PriceLevel>,
    exchange: Option<String>,
    symbol: Option<String>,
    exchange_timestamp: Option<OffsetDateTime>,
    last_update_time: Option<OffsetDateTime>,
    history: RollingWindow<BookSample>,
}

impl Default for OrderBookState {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderBookState {
    /// Create an empty book.
    pub fn new() -> Self {
        Self {
            asks: Vec::with_capacity(MAX_BOOK_DEPTH),
            bids: Vec::with_capacity(MAX_BOOK_DEPTH),
            exchange: None,
            symbol: None,
            exchange_timestamp: None,
            last_update_time: None,
            history: RollingWindow::new(HISTORY_CAPACITY),
        }
    }

    /// Validate and apply a raw snapshot, stamping it with the current time.
    pub fn update(&mut self, raw: &RawSnapshot) -> Result<(), SnapshotError> {
        self.update_at(raw, OffsetDateTime::now_utc())
    }

    /// Validate and apply a raw snapshot as of `now`.
    ///
    /// On error nothing is modified.
    pub fn update_at(&mut self, raw: &RawSnapshot, now: OffsetDateTime) -> Result<(), SnapshotError> {
        let snapshot = OrderBookSnapshot::parse(raw)?;
        self.apply_at(snapshot, now);
        Ok(())
    }

    /// Apply an already validated snapshot, stamping it with the current time.
    pub fn apply(&mut self, snapshot: OrderBookSnapshot) {
        self.apply_at(snapshot, OffsetDateTime::now_utc());
    }

    /// Apply an already validated snapshot as of `now`.
    #[instrument(skip(self, snapshot), fields(asks = snapshot.asks.len(), bids = snapshot.bids.len()))]
    pub fn apply_at(&mut self, snapshot: OrderBookSnapshot, now: OffsetDateTime) {
        let OrderBookSnapshot {
            exchange,
            symbol,
            timestamp,
            mut asks,
            mut bids,
        } = snapshot;

        // Depth is capped in feed order; the kept levels are then sorted since
        // feed ordering is never trusted.
        asks.truncate(MAX_BOOK_DEPTH);
        bids.truncate(MAX_BOOK_DEPTH);
        asks.sort_by(|a, b| a.price.cmp(&b.price));
        bids.sort_by(|a, b| b.price.cmp(&a.price));

        self.asks = asks;
        self.bids = bids;
        self.exchange = Some(exchange);
        self.symbol = Some(symbol);
        self.exchange_timestamp = Some(timestamp);
        self.last_update_time = Some(now);

        let (Some(best_ask), Some(best_bid)) = (self.best_ask(), self.best_bid()) else {
            debug!("one-sided book, history not extended");
            return;
        };

        let mid_price = midpoint(best_ask, best_bid);
        let sample = BookSample {
            at: now,
            mid_price,
            spread: best_ask - best_bid,
            near_touch_volume: self.near_touch_volume(mid_price),
        };
        self.history.push(sample);
    }

    fn near_touch_volume(&self, mid_price: Decimal) -> Decimal {
        let threshold = mid_price * NEAR_TOUCH_BAND;
        let upper = mid_price.saturating_add(threshold);
        let lower = mid_price - threshold;
        let ask_volume = self
            .asks
            .iter()
            .take_while(|l| l.price <= upper)
            .fold(Decimal::ZERO, |acc, l| acc.saturating_add(l.quantity));
        let bid_volume = self
            .bids
            .iter()
            .take_while(|l| l.price >= lower)
            .fold(Decimal::ZERO, |acc, l| acc.saturating_add(l.quantity));
        ask_volume.saturating_add(bid_volume)
    }

    /// Ask levels, ascending by price.
    pub fn asks(&self) -> &[PriceLevel] {
        &self.asks
    }

    /// Bid levels, descending by price.
    pub fn bids(&self) -> &[PriceLevel] {
        &self.bids
    }

    /// Levels a market order on `side` would consume.
    pub fn levels(&self, side: Side) -> &[PriceLevel] {
        match side {
            Side::Buy => &self.asks,
            Side::Sell => &self.bids,
        }
    }

    /// Best (lowest) ask price.
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|l| l.price)
    }

    /// Best (highest) bid price.
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|l| l.price)
    }

    /// Current mid price, if both sides are present.
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => Some(midpoint(ask, bid)),
            _ => None,
        }
    }

    /// Current absolute spread, if both sides are present.
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Whether either side has no levels.
    pub fn is_one_sided_or_empty(&self) -> bool {
        self.asks.is_empty() || self.bids.is_empty()
    }

    /// Walk the book for a hypothetical order of `notional` quote currency.
    pub fn liquidity_for(&self, notional: Decimal, side: Side) -> Liquidity {
        liquidity_for(self.levels(side), notional)
    }

    /// Exchange of the last accepted snapshot.
    pub fn exchange(&self) -> Option<&str> {
        self.exchange.as_deref()
    }

    /// Symbol of the last accepted snapshot.
    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    /// Exchange timestamp of the last accepted snapshot.
    pub fn exchange_timestamp(&self) -> Option<OffsetDateTime> {
        self.exchange_timestamp
    }

    /// Local time of the last accepted snapshot.
    pub fn last_update_time(&self) -> Option<OffsetDateTime> {
        self.last_update_time
    }

    /// Number of history samples (shared by all three series).
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// All history samples, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &BookSample> + '_ {
        self.history.iter()
    }

    /// Mid price series, oldest first.
    pub fn mid_price_history(&self) -> impl Iterator<Item = (OffsetDateTime, Decimal)> + '_ {
        self.history.iter().map(|s| (s.at, s.mid_price))
    }

    /// Spread series, oldest first.
    pub fn spread_history(&self) -> impl Iterator<Item = (OffsetDateTime, Decimal)> + '_ {
        self.history.iter().map(|s| (s.at, s.spread))
    }

    /// Near-touch volume series, oldest first.
    pub fn near_touch_volume_history(&self) -> impl Iterator<Item = (OffsetDateTime, Decimal)> + '_ {
        self.history.iter().map(|s| (s.at, s.near_touch_volume))
    }

    /// The newest `n` near-touch volumes, oldest first.
    pub fn recent_near_touch_volumes(&self, n: usize) -> impl Iterator<Item = Decimal> + '_ {
        self.history.recent(n).map(|s| s.near_touch_volume)
    }

    /// Most recent history sample.
    pub fn latest_sample(&self) -> Option<&BookSample> {
        self.history.last()
    }
}

/// `(ask + bid) / 2` without overflowing for prices near `Decimal::MAX`.
fn midpoint(ask: Decimal, bid: Decimal) -> Decimal {
    match ask.checked_add(bid) {
        Some(sum) => sum / Decimal::TWO,
        None => ask / Decimal::TWO + bid / Decimal::TWO,
    }
}
