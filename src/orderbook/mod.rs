//! Order book module for managing market data.
//!
//! This module handles:
//! - Order book types and snapshot validation
//! - Book state with bounded rolling history
//! - Walk-the-book liquidity pricing
//! - WebSocket and replay feeds

pub mod feed;
pub mod replay;
pub mod state;
pub mod types;
pub mod walker;

pub use feed::{MarketFeed, ReconnectConfig};
pub use replay::{load_snapshots, read_snapshots};
pub use state::{BookSample, OrderBookState, HISTORY_CAPACITY, MAX_BOOK_DEPTH, NEAR_TOUCH_BAND};
pub use types::{OrderBookSnapshot, PriceLevel, RawLevel, RawNumber, RawSnapshot, Side};
pub use walker::{liquidity_for, Liquidity};
