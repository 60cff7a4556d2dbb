//! Cost module for estimating execution costs.
//!
//! This module handles:
//! - Slippage from walking the book
//! - Square-root market impact
//! - Maker/taker split and tiered fees

pub mod estimator;
pub mod fees;
pub mod impact;

pub use estimator::{CostEstimator, CostReport, ExecutionSplit, OrderParams};
pub use fees::{FeeRates, FeeTier};
pub use impact::CostModel;
