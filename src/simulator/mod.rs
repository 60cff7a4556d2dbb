//! Simulator module tying the book, cost model and latency tracking together.
//!
//! This module handles:
//! - The single-writer orchestrator and its lifecycle
//! - Parameter updates from outside
//! - Ingestion and fixed-cadence reporting tasks

pub mod orchestrator;
pub mod params;
pub mod runner;

pub use orchestrator::{FeedState, SharedSimulator, SimulationReport, Simulator};
pub use params::ParamsUpdate;
pub use runner::{replay, run_ingestion, run_reporter, ReplaySummary};
