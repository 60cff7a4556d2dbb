//! Owns the book, the cost model and the latency tracker, and applies snapshots.

use std::sync::Arc;
use std::time::Instant;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use strum::Display;
use time::format_description::well_known::Rfc3339;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use super::params::{validate, ParamsUpdate};
use crate::cost::{CostEstimator, CostModel, CostReport, OrderParams};
use crate::error::{ParamsError, Result, SimulatorError};
use crate::latency::{LatencyStats, LatencyTracker};
use crate::metrics;
use crate::orderbook::{OrderBookState, RawSnapshot};

/// Simulator shared between the ingestion task and readers.
///
/// The one lock guards the book, its histories and the latency window, so a
/// reader can only ever see a fully applied update.
pub type SharedSimulator = Arc<RwLock<Simulator>>;

/// Lifecycle of the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FeedState {
    /// No snapshot accepted yet.
    Disconnected,
    /// Snapshots are being applied.
    Streaming,
    /// Shut down; terminal.
    Stopped,
}

/// Read-only composite handed to presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    /// Exchange of the book.
    pub exchange: String,
    /// Instrument symbol.
    pub symbol: String,
    /// Simulator lifecycle state.
    pub state: FeedState,
    /// Best bid price.
    pub best_bid: Option<Decimal>,
    /// Best ask price.
    pub best_ask: Option<Decimal>,
    /// `(best_ask - best_bid) / best_bid * 100`.
    pub spread_pct: Option<f64>,
    /// Local time of the last accepted snapshot (RFC 3339).
    pub last_update: Option<String>,
    /// Exchange time of the last accepted snapshot (RFC 3339).
    pub exchange_timestamp: Option<String>,
    /// Order notional the visible depth could not absorb; slippage only
    /// prices the filled part when this is non-zero.
    pub unfilled_notional: Decimal,
    /// Parameters the costs were computed with.
    pub params: OrderParams,
    /// Cost breakdown.
    pub costs: CostReport,
    /// Snapshot processing latency.
    pub latency: LatencyStats,
    /// Snapshots accepted so far.
    pub snapshots_applied: u64,
    /// Snapshots rejected as malformed so far.
    pub snapshots_rejected: u64,
}

/// Single-writer orchestrator for one instrument.
#[derive(Debug)]
pub struct Simulator {
    exchange: String,
    symbol: String,
    book: OrderBookState,
    latency: LatencyTracker,
    model: CostModel,
    params: OrderParams,
    state: FeedState,
    snapshots_applied: u64,
    snapshots_rejected: u64,
}

impl Simulator {
    /// Create a simulator for the given instrument labels.
    pub fn new(
        exchange: impl Into<String>,
        symbol: impl Into<String>,
        model: CostModel,
        params: OrderParams,
    ) -> std::result::Result<Self, ParamsError> {
        validate(&params)?;
        Ok(Self {
            exchange: exchange.into(),
            symbol: symbol.into(),
            book: OrderBookState::new(),
            latency: LatencyTracker::default(),
            model,
            params,
            state: FeedState::Disconnected,
            snapshots_applied: 0,
            snapshots_rejected: 0,
        })
    }

    /// Wrap in the shared handle used by the async tasks.
    pub fn into_shared(self) -> SharedSimulator {
        Arc::new(RwLock::new(self))
    }

    /// Apply one snapshot from the feed and time it.
    ///
    /// Malformed snapshots are still timed, counted and logged; the book keeps
    /// its previous state and the error is returned.
    #[instrument(skip(self, raw), fields(state = %self.state))]
    pub fn apply_snapshot(&mut self, raw: &RawSnapshot) -> Result<()> {
        if self.state == FeedState::Stopped {
            return Err(SimulatorError::Stopped.into());
        }

        let start = Instant::now();
        let result = self.book.update(raw);
        let elapsed = start.elapsed();

        self.latency.record(elapsed);
        metrics::record_snapshot_apply_latency(elapsed);

        match result {
            Ok(()) => {
                self.snapshots_applied += 1;
                metrics::inc_snapshots_applied();
                if self.state == FeedState::Disconnected {
                    self.state = FeedState::Streaming;
                    info!(
                        exchange = self.book.exchange().unwrap_or_default(),
                        symbol = self.book.symbol().unwrap_or_default(),
                        "First snapshot accepted, streaming"
                    );
                }
                Ok(())
            }
            Err(e) => {
                self.snapshots_rejected += 1;
                metrics::inc_snapshots_rejected();
                warn!(error = %e, "Rejected snapshot");
                Err(e.into())
            }
        }
    }

    /// Stop accepting snapshots. Idempotent and irreversible.
    pub fn stop(&mut self) {
        if self.state != FeedState::Stopped {
            info!(
                applied = self.snapshots_applied,
                rejected = self.snapshots_rejected,
                "Simulator stopped"
            );
            self.state = FeedState::Stopped;
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> FeedState {
        self.state
    }

    /// Current order parameters.
    pub fn params(&self) -> &OrderParams {
        &self.params
    }

    /// Apply a partial parameter update; on error nothing changes.
    pub fn update_params(&mut self, update: &ParamsUpdate) -> std::result::Result<&OrderParams, ParamsError> {
        let next = update.apply_to(&self.params)?;
        info!(
            quantity_usd = %next.quantity_usd,
            side = %next.side,
            volatility = next.volatility,
            fee_tier = %next.fee_tier,
            "Updated parameters"
        );
        self.params = next;
        Ok(&self.params)
    }

    /// The book.
    pub fn book(&self) -> &OrderBookState {
        &self.book
    }

    /// The latency window.
    pub fn latency(&self) -> &LatencyTracker {
        &self.latency
    }

    /// Cost breakdown for the current parameters.
    pub fn costs(&self) -> CostReport {
        CostEstimator::new(&self.book, &self.model).evaluate(&self.params)
    }

    /// Build the presentation composite.
    pub fn report(&self) -> SimulationReport {
        let best_bid = self.book.best_bid();
        let best_ask = self.book.best_ask();
        let spread_pct = match (best_ask, best_bid) {
            (Some(ask), Some(bid)) => (ask - bid)
                .checked_div(bid)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .and_then(|pct| pct.to_f64())
                .or_else(|| Some((ask.to_f64()? - bid.to_f64()?) / bid.to_f64()? * 100.0)),
            _ => None,
        };
        let liquidity = self
            .book
            .liquidity_for(self.params.quantity_usd, self.params.side);

        SimulationReport {
            exchange: self.book.exchange().unwrap_or(self.exchange.as_str()).to_string(),
            symbol: self.book.symbol().unwrap_or(self.symbol.as_str()).to_string(),
            state: self.state,
            best_bid,
            best_ask,
            spread_pct,
            last_update: self
                .book
                .last_update_time()
                .and_then(|t| t.format(&Rfc3339).ok()),
            exchange_timestamp: self
                .book
                .exchange_timestamp()
                .and_then(|t| t.format(&Rfc3339).ok()),
            unfilled_notional: liquidity.unfilled_notional,
            params: self.params.clone(),
            costs: self.costs(),
            latency: self.latency.stats(),
            snapshots_applied: self.snapshots_applied,
            snapshots_rejected: self.snapshots_rejected,
        }
    }
}
