//! Async tasks driving the simulator: ingestion and periodic reporting.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::orchestrator::{SharedSimulator, SimulationReport, Simulator};
use crate::metrics;
use crate::orderbook::RawSnapshot;

/// Counts from a batch replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplaySummary {
    /// Snapshots accepted.
    pub applied: usize,
    /// Snapshots rejected.
    pub rejected: usize,
}

/// Apply snapshots one at a time until the feed closes or shutdown is signalled,
/// then stop the simulator.
pub async fn run_ingestion(
    simulator: SharedSimulator,
    mut feed: mpsc::Receiver<RawSnapshot>,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("Ingestion started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            next = feed.recv() => match next {
                Some(raw) => {
                    // Failures are logged and counted inside.
                    if let Err(e) = simulator.write().await.apply_snapshot(&raw) {
                        debug!(error = %e, "Snapshot not applied");
                    }
                }
                None => {
                    info!("Feed closed");
                    break;
                }
            },
        }
    }

    simulator.write().await.stop();
    info!("Ingestion stopped");
}

/// Publish a fresh report every `period` until shutdown.
///
/// Late ticks are skipped rather than bunched up, and the read lock is held
/// only while one report is built.
pub async fn run_reporter(
    simulator: SharedSimulator,
    period: Duration,
    publisher: watch::Sender<SimulationReport>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let report = {
                    let _timer = metrics::timer_report_build();
                    simulator.read().await.report()
                };
                metrics::set_cost_gauges(&report.costs);
                debug!(
                    state = %report.state,
                    net_cost_pct = report.costs.net_cost_pct,
                    avg_latency_ms = report.latency.avg_ms,
                    "Report published"
                );
                publisher.send_replace(report);
            }
        }
    }

    debug!("Reporter stopped");
}

/// Apply a recorded sequence synchronously.
pub fn replay<'a>(
    simulator: &mut Simulator,
    snapshots: impl IntoIterator<Item = &'a RawSnapshot>,
) -> ReplaySummary {
    let mut summary = ReplaySummary::default();
    for raw in snapshots {
        match simulator.apply_snapshot(raw) {
            Ok(()) => summary.applied += 1,
            Err(_) => summary.rejected += 1,
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::{CostModel, OrderParams};
    use crate::orderbook::RawLevel;
    use crate::simulator::FeedState;

    fn level(price: &str, qty: &str) -> RawLevel {
        vec![price.into(), qty.into()]
    }

    fn raw(symbol: Option<&str>) -> RawSnapshot {
        RawSnapshot {
            exchange: Some("OKX".to_string()),
            symbol: symbol.map(str::to_string),
            timestamp: Some("2025-05-04T10:39:13Z".to_string()),
            asks: Some(vec![level("100", "2")]),
            bids: Some(vec![level("99", "2")]),
        }
    }

    fn simulator() -> Simulator {
        Simulator::new("OKX", "BTC-USDT-SWAP", CostModel::default(), OrderParams::default()).unwrap()
    }

    #[test]
    fn replay_counts_outcomes() {
        let mut sim = simulator();
        let snapshots = vec![raw(Some("BTC-USDT-SWAP")), raw(None), raw(Some("BTC-USDT-SWAP"))];

        let summary = replay(&mut sim, &snapshots);

        assert_eq!(summary, ReplaySummary { applied: 2, rejected: 1 });
        assert_eq!(sim.book().history_len(), 2);
    }

    #[tokio::test]
    async fn ingestion_applies_in_order_and_stops_when_feed_closes() {
        let sim = simulator().into_shared();
        let (tx, rx) = mpsc::channel(8);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        tx.send(raw(Some("BTC-USDT-SWAP"))).await.unwrap();
        tx.send(raw(None)).await.unwrap();
        drop(tx);

        run_ingestion(sim.clone(), rx, shutdown_rx).await;

        let sim = sim.read().await;
        assert_eq!(sim.state(), FeedState::Stopped);
        assert_eq!(sim.latency().len(), 2);
        let report = sim.report();
        assert_eq!(report.snapshots_applied, 1);
        assert_eq!(report.snapshots_rejected, 1);
    }

    #[tokio::test]
    async fn shutdown_stops_ingestion() {
        let sim = simulator().into_shared();
        let (_tx, rx) = mpsc::channel::<RawSnapshot>(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(run_ingestion(sim.clone(), rx, shutdown_rx));
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(sim.read().await.state(), FeedState::Stopped);
    }

    #[tokio::test]
    async fn reporter_publishes_latest_state() {
        let sim = simulator().into_shared();
        let initial = sim.read().await.report();
        let (report_tx, mut report_rx) = watch::channel(initial);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        sim.write()
            .await
            .apply_snapshot(&raw(Some("BTC-USDT-SWAP")))
            .unwrap();

        let handle = tokio::spawn(run_reporter(
            sim.clone(),
            Duration::from_millis(5),
            report_tx,
            shutdown_rx,
        ));

        tokio::time::timeout(Duration::from_secs(2), report_rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report_rx.borrow().state, FeedState::Streaming);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
