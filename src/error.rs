//! Unified error types for the trade simulator.

use rust_decimal::Decimal;
use thiserror::Error;

/// Unified error type for the trade simulator.
#[derive(Error, Debug)]
pub enum SimError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Snapshot rejected during validation.
    #[error(transparent)]
    MalformedSnapshot(#[from] SnapshotError),

    /// Invalid simulation parameters.
    #[error("parameter error: {0}")]
    Params(#[from] ParamsError),

    /// Simulator lifecycle error.
    #[error("simulator error: {0}")]
    Simulator(#[from] SimulatorError),

    /// WebSocket error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] WsError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Structural problems in an incoming order book snapshot.
///
/// Any of these rejects the whole snapshot; the book keeps its prior state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// A required field was absent or empty.
    #[error("malformed snapshot: missing field `{0}`")]
    MissingField(&'static str),

    /// The timestamp could not be parsed as RFC 3339.
    #[error("malformed snapshot: invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp {
        /// Raw timestamp text.
        value: String,
        /// Parser message.
        reason: String,
    },

    /// A price or quantity was not a decimal number.
    #[error("malformed snapshot: {side} {field} {value:?} is not a number")]
    InvalidNumber {
        /// Book side ("ask" or "bid").
        side: &'static str,
        /// Which part of the level ("price" or "quantity").
        field: &'static str,
        /// Raw text.
        value: String,
    },

    /// A price was zero or negative.
    #[error("malformed snapshot: {side} price {price} is not positive")]
    NonPositivePrice {
        /// Book side ("ask" or "bid").
        side: &'static str,
        /// Offending price.
        price: Decimal,
    },

    /// A quantity was negative.
    #[error("malformed snapshot: {side} quantity {quantity} at price {price} is negative")]
    NegativeQuantity {
        /// Book side ("ask" or "bid").
        side: &'static str,
        /// Level price.
        price: Decimal,
        /// Offending quantity.
        quantity: Decimal,
    },
}

/// Invalid values supplied by the parameter input collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamsError {
    /// Order notional must be strictly positive.
    #[error("order quantity must be positive, got {0}")]
    InvalidQuantity(Decimal),

    /// Volatility must be a finite, non-negative fraction.
    #[error("volatility must be a finite non-negative fraction, got {0}")]
    InvalidVolatility(f64),

    /// Side must be "buy" or "sell".
    #[error("unknown order side {0:?}")]
    InvalidSide(String),
}

/// Simulator lifecycle errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatorError {
    /// The simulator has been stopped and accepts no further snapshots.
    #[error("simulator is stopped")]
    Stopped,
}

/// WebSocket connection and message errors.
#[derive(Error, Debug)]
pub enum WsError {
    /// Connection failed.
    #[error("websocket connection failed: {0}")]
    ConnectionFailed(String),

    /// Message parsing failed.
    #[error("failed to parse websocket message: {0}")]
    ParseError(String),

    /// Gave up reconnecting.
    #[error("giving up after {attempts} failed connection attempts")]
    RetriesExhausted {
        /// Consecutive failed attempts.
        attempts: u32,
    },

    /// Tungstenite error.
    #[error("tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn snapshot_errors_read_as_malformed() {
        let err = SnapshotError::MissingField("symbol");
        assert_eq!(err.to_string(), "malformed snapshot: missing field `symbol`");

        let err = SnapshotError::NonPositivePrice {
            side: "ask",
            price: dec!(0),
        };
        assert!(err.to_string().starts_with("malformed snapshot"));
    }

    #[test]
    fn sim_error_is_transparent_for_snapshots() {
        let err: SimError = SnapshotError::MissingField("timestamp").into();
        assert!(matches!(err, SimError::MalformedSnapshot(_)));
        assert_eq!(err.to_string(), "malformed snapshot: missing field `timestamp`");
    }
}
