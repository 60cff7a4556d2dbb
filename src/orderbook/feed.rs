//! WebSocket client for the L2 order book feed.
//!
//! Features:
//! - Automatic reconnection with exponential backoff
//! - Gives up after a configurable number of consecutive failed connects
//! - Undecodable frames are counted and dropped before reaching the book

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use super::types::RawSnapshot;
use crate::error::WsError;
use crate::metrics;

/// Reconnection configuration for the feed.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Initial backoff delay in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum backoff delay in seconds.
    pub max_delay_s: u64,
    /// Backoff multiplier (e.g., 2.0 for exponential).
    pub backoff_multiplier: f64,
    /// Consecutive failed connects before giving up, 0 for never.
    pub max_retries: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 2000,
            max_delay_s: 30,
            backoff_multiplier: 2.0,
            max_retries: 5,
        }
    }
}

impl ReconnectConfig {
    /// Create from config values.
    pub fn from_config(initial_delay_ms: u64, max_delay_s: u64, max_retries: u32) -> Self {
        Self {
            initial_delay_ms,
            max_delay_s,
            max_retries,
            ..Default::default()
        }
    }

    /// Calculate next delay with exponential backoff.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let delay_ms = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let max_delay_ms = self.max_delay_s * 1000;
        let clamped_ms = delay_ms.min(max_delay_ms as f64) as u64;
        Duration::from_millis(clamped_ms)
    }

    /// Whether `failures` consecutive failures exhaust the retry budget.
    pub fn exhausted(&self, failures: u32) -> bool {
        self.max_retries != 0 && failures >= self.max_retries
    }
}

/// Streams order book snapshots from a WebSocket endpoint.
pub struct MarketFeed {
    /// WebSocket URL.
    url: String,
    /// Reconnection configuration.
    reconnect_config: ReconnectConfig,
    /// Connection state.
    connected: Arc<AtomicBool>,
    /// Total reconnection attempts.
    reconnect_attempts: Arc<AtomicU64>,
}

impl MarketFeed {
    /// Create a feed client with default reconnection settings.
    pub fn new(url: String) -> Self {
        Self::with_reconnect_config(url, ReconnectConfig::default())
    }

    /// Create with custom reconnection config.
    pub fn with_reconnect_config(url: String, config: ReconnectConfig) -> Self {
        Self {
            url,
            reconnect_config: config,
            connected: Arc::new(AtomicBool::new(false)),
            reconnect_attempts: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Check if currently connected.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Get reconnection attempt count.
    pub fn reconnect_attempts(&self) -> u64 {
        self.reconnect_attempts.load(Ordering::SeqCst)
    }

    /// Connect once and forward snapshots until the connection ends.
    ///
    /// Returns `Ok(true)` if the receiver is gone and the feed should stop.
    async fn stream_once(&self, tx: &mpsc::Sender<RawSnapshot>) -> Result<bool, WsError> {
        info!(url = %self.url, "Connecting to order book feed");

        let (mut ws_stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;

        self.connected.store(true, Ordering::SeqCst);
        info!("Order book feed connected");

        // Server pushes snapshots without a subscription message.
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    let start = Instant::now();
                    metrics::inc_ws_messages_received();
                    let parsed = decode_snapshot(&text);
                    metrics::record_ws_message_latency(start);

                    match parsed {
                        Ok(snapshot) => {
                            if tx.send(snapshot).await.is_err() {
                                self.connected.store(false, Ordering::SeqCst);
                                return Ok(true);
                            }
                        }
                        Err(e) => {
                            metrics::inc_ws_decode_errors();
                            error!(error = %e, "Dropping undecodable feed message");
                        }
                    }
                }
                Ok(Message::Ping(_)) => {
                    debug!("Received ping");
                }
                Ok(Message::Pong(_)) => {
                    debug!("Received pong");
                }
                Ok(Message::Close(frame)) => {
                    warn!(frame = ?frame, "WebSocket closed");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    self.connected.store(false, Ordering::SeqCst);
                    return Err(WsError::Tungstenite(e));
                }
            }
        }

        self.connected.store(false, Ordering::SeqCst);
        Ok(false)
    }

    /// Run with automatic reconnection on disconnect.
    /// Returns a channel receiver that yields raw snapshots in receive order.
    pub fn run_with_reconnect(self: Arc<Self>, buffer: usize) -> mpsc::Receiver<RawSnapshot> {
        let (tx, rx) = mpsc::channel(buffer.max(1));

        let feed = self;

        tokio::spawn(async move {
            let mut attempt = 0u32;

            loop {
                info!(attempt = attempt, "Attempting feed connection");

                match feed.stream_once(&tx).await {
                    Ok(true) => {
                        info!("Channel closed, stopping feed");
                        return;
                    }
                    Ok(false) => {
                        // Connection was established, so the failure streak is over.
                        attempt = 0;
                        warn!("Feed stream ended, will reconnect");
                    }
                    Err(e) => {
                        attempt = attempt.saturating_add(1);
                        error!(error = %e, attempt = attempt, "Feed connection failed");
                        if feed.reconnect_config.exhausted(attempt) {
                            error!(
                                "{}",
                                WsError::RetriesExhausted { attempts: attempt }
                            );
                            return;
                        }
                    }
                }

                if tx.is_closed() {
                    info!("Channel closed, stopping feed");
                    return;
                }

                let delay = feed.reconnect_config.next_delay(attempt.saturating_sub(1));
                feed.reconnect_attempts.fetch_add(1, Ordering::SeqCst);
                metrics::inc_ws_reconnects();

                info!(delay_ms = delay.as_millis() as u64, "Reconnecting after delay");
                tokio::time::sleep(delay).await;
            }
        });

        rx
    }
}

/// Decode one feed frame.
pub fn decode_snapshot(text: &str) -> Result<RawSnapshot, WsError> {
    serde_json::from_str(text).map_err(|e| WsError::ParseError(e.to_string()))
}
