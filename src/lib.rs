//! Real-time execution cost estimator for a single instrument.
//!
//! The simulator consumes full L2 order book snapshots, keeps a bounded
//! history of mid price, spread and near-touch volume, and estimates what a
//! hypothetical market order of a given USD notional would cost right now:
//!
//! ```text
//! slippage      walk the opposite side of the book
//! market impact sigma * sqrt(Q / daily_volume * horizon)
//! fees          maker/taker split weighted by the tier's rates
//! ─────────────────────────────────────────────
//! net cost      slippage + fees + market impact
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`orderbook`]: Book state, liquidity walk, feeds
//! - [`cost`]: Slippage, impact and fee models
//! - [`latency`]: Rolling snapshot processing latency
//! - [`simulator`]: Orchestrator and async tasks
//! - [`api`]: HTTP API for health, reports, parameters and metrics
//! - [`metrics`]: Prometheus metric names and helpers
//! - [`window`]: Bounded FIFO used for histories
//! - [`utils`]: Utility functions

pub mod api;
pub mod config;
pub mod cost;
pub mod error;
pub mod latency;
pub mod metrics;
pub mod orderbook;
pub mod simulator;
pub mod utils;
pub mod window;

pub use config::Config;
pub use error::{Result, SimError};
