//! End-to-end tests through the public API: recorded feed lines in, reports out.
//!
//! Run with: cargo test --test integration

use std::io::Cursor;

use pretty_assertions::assert_eq;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde_json::json;

use trade_simulator::cost::{CostModel, FeeTier, OrderParams};
use trade_simulator::error::SimError;
use trade_simulator::orderbook::{read_snapshots, RawSnapshot, Side, HISTORY_CAPACITY};
use trade_simulator::simulator::{replay, FeedState, ParamsUpdate, ReplaySummary, Simulator};

fn simulator() -> Simulator {
    Simulator::new(
        "OKX",
        "BTC-USDT-SWAP",
        CostModel::default(),
        OrderParams::default(),
    )
    .unwrap()
}

fn frame(asks: serde_json::Value, bids: serde_json::Value) -> String {
    json!({
        "timestamp": "2025-05-04T10:39:13Z",
        "exchange": "OKX",
        "symbol": "BTC-USDT-SWAP",
        "asks": asks,
        "bids": bids,
    })
    .to_string()
}

fn snapshots(lines: &[String]) -> Vec<RawSnapshot> {
    read_snapshots(Cursor::new(lines.join("\n"))).unwrap()
}

#[test]
fn recorded_feed_produces_expected_costs() {
    let lines = vec![frame(
        json!([["101", "3"], ["100", "2"]]),
        json!([["98", "3"], ["99", "2"]]),
    )];
    let mut sim = simulator();
    sim.update_params(&ParamsUpdate {
        quantity_usd: Some(dec!(150)),
        side: Some("buy".to_string()),
        ..Default::default()
    })
    .unwrap();

    let summary = replay(&mut sim, &snapshots(&lines));
    assert_eq!(summary, ReplaySummary { applied: 1, rejected: 0 });

    // Unsorted input is stored best price first.
    assert_eq!(sim.book().best_ask(), Some(dec!(100)));
    assert_eq!(sim.book().best_bid(), Some(dec!(99)));

    let liquidity = sim.book().liquidity_for(dec!(150), Side::Buy);
    assert_eq!(liquidity.average_price, dec!(100));
    assert_eq!(liquidity.executed_quantity, dec!(1.5));

    let report = sim.report();
    assert_eq!(report.state, FeedState::Streaming);
    assert!((report.costs.slippage_pct - 0.5025125628).abs() < 1e-6);
    assert!((report.costs.maker_pct + report.costs.taker_pct - 100.0).abs() < 1e-9);
    assert!(report.costs.market_impact_pct > 0.0);
    let net = report.costs.slippage_pct + report.costs.fee_pct + report.costs.market_impact_pct;
    assert!((report.costs.net_cost_pct - net).abs() < 1e-12);
}

#[test]
fn empty_book_reports_fallback_costs() {
    let lines = vec![frame(json!([]), json!([]))];
    let mut sim = simulator();
    sim.update_params(&ParamsUpdate {
        fee_tier: Some("VIP3".to_string()),
        ..Default::default()
    })
    .unwrap();

    replay(&mut sim, &snapshots(&lines));
    let report = sim.report();

    assert_eq!(sim.book().history_len(), 0);
    assert_eq!(report.costs.slippage_pct, 0.0);
    assert_eq!(report.costs.market_impact_pct, 0.0);
    assert_eq!(report.costs.maker_pct, 0.0);
    assert_eq!(report.costs.taker_pct, 100.0);

    let taker_rate = FeeTier::Vip3.rates().taker.to_f64().unwrap();
    assert!((report.costs.fee_pct - taker_rate * 100.0).abs() < 1e-12);
}

#[test]
fn history_is_bounded_and_aligned_after_many_updates() {
    let lines: Vec<String> = (0..=HISTORY_CAPACITY)
        .map(|i| {
            let ask = 100 + i;
            let bid = 99 + i;
            frame(
                json!([[ask.to_string(), "1"]]),
                json!([[bid.to_string(), "1"]]),
            )
        })
        .collect();
    assert_eq!(lines.len(), 301);

    let mut sim = simulator();
    replay(&mut sim, &snapshots(&lines));
    let book = sim.book();

    assert_eq!(book.history_len(), 300);
    assert_eq!(book.mid_price_history().count(), 300);
    assert_eq!(book.spread_history().count(), 300);
    assert_eq!(book.near_touch_volume_history().count(), 300);

    // The first update was evicted; the rest are kept in arrival order.
    let mids: Vec<_> = book.mid_price_history().map(|(_, mid)| mid).collect();
    assert_eq!(mids.first(), Some(&dec!(100.5)));
    assert_eq!(mids.last(), Some(&dec!(399.5)));
    assert!(mids.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn malformed_lines_are_rejected_without_disturbing_the_book() {
    let good = frame(json!([["100", "2"]]), json!([["99", "2"]]));
    let bad_number = frame(json!([["abc", "2"]]), json!([["99", "2"]]));
    let missing_symbol = json!({
        "timestamp": "2025-05-04T10:39:13Z",
        "exchange": "OKX",
        "asks": [["100", "2"]],
        "bids": [["99", "2"]],
    })
    .to_string();
    let lines = vec![good, "not json".to_string(), bad_number, missing_symbol];

    let parsed = snapshots(&lines);
    assert_eq!(parsed.len(), 3);

    let mut sim = simulator();
    let summary = replay(&mut sim, &parsed);

    assert_eq!(summary, ReplaySummary { applied: 1, rejected: 2 });
    assert_eq!(sim.book().best_ask(), Some(dec!(100)));
    assert_eq!(sim.book().history_len(), 1);
    assert_eq!(sim.latency().len(), 3);
}

#[test]
fn stopped_simulator_keeps_its_last_report() {
    let lines = vec![frame(json!([["100", "2"]]), json!([["99", "2"]]))];
    let parsed = snapshots(&lines);
    let mut sim = simulator();

    replay(&mut sim, &parsed);
    sim.stop();
    let before = sim.report();

    let err = sim.apply_snapshot(&parsed[0]).unwrap_err();
    assert!(matches!(err, SimError::Simulator(_)));
    assert_eq!(sim.report().snapshots_applied, before.snapshots_applied);
    assert_eq!(sim.state(), FeedState::Stopped);
}

#[test]
fn unknown_tier_costs_the_same_as_vip0() {
    let lines = vec![frame(
        json!([["100", "2"], ["101", "3"]]),
        json!([["99", "2"], ["98", "3"]]),
    )];
    let parsed = snapshots(&lines);

    let mut unknown = simulator();
    unknown
        .update_params(&ParamsUpdate {
            fee_tier: Some("gold".to_string()),
            ..Default::default()
        })
        .unwrap();
    replay(&mut unknown, &parsed);

    let mut vip0 = simulator();
    replay(&mut vip0, &parsed);

    assert_eq!(unknown.params().fee_tier, FeeTier::Vip0);
    assert_eq!(unknown.costs().fee_pct, vip0.costs().fee_pct);
}
