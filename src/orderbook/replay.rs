//! Replay of recorded snapshots from newline-delimited JSON.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{info, warn};

use super::feed::decode_snapshot;
use super::types::RawSnapshot;
use crate::error::Result;

/// Read every decodable snapshot from `reader`, one JSON object per line.
///
/// Blank lines are ignored; lines that fail to decode are logged and skipped,
/// the same way the live feed drops undecodable frames.
pub fn read_snapshots<R: BufRead>(reader: R) -> Result<Vec<RawSnapshot>> {
    let mut snapshots = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match decode_snapshot(line) {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(e) => warn!(line = index + 1, error = %e, "Skipping undecodable replay line"),
        }
    }

    Ok(snapshots)
}

/// Load a replay file from disk.
pub fn load_snapshots(path: impl AsRef<Path>) -> Result<Vec<RawSnapshot>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let snapshots = read_snapshots(BufReader::new(file))?;
    info!(path = %path.display(), count = snapshots.len(), "Loaded replay file");
    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_lines_and_skips_garbage() {
        let data = concat!(
            r#"{"timestamp":"2025-05-04T10:39:13Z","exchange":"OKX","symbol":"BTC-USDT-SWAP","asks":[["100","2"]],"bids":[["99","2"]]}"#,
            "\n",
            "\n",
            "{not json}\n",
            r#"{"timestamp":"2025-05-04T10:39:14Z","exchange":"OKX","symbol":"BTC-USDT-SWAP","asks":[],"bids":[]}"#,
            "\n",
        );

        let snapshots = read_snapshots(Cursor::new(data)).unwrap();

        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[1].timestamp.as_deref(), Some("2025-05-04T10:39:14Z"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = load_snapshots("/definitely/not/here.jsonl");
        assert!(matches!(result, Err(crate::error::SimError::Io(_))));
    }
}
