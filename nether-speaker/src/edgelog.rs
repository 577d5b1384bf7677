//! Edge log files
//!
//! A recorded speaker trace: one timestamp (reference-clock cycles) per line,
//! decimal or `0x` hex. Blank lines and `#` comments are ignored.
//!
//! ```text
//! # 1 kHz beep, first two periods
//! 0
//! 2385
//! 0x12a2
//! ```

use std::path::{Path, PathBuf};

use nether_edgeq::Timestamp;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum EdgeLogError {
    #[error("failed to read edge log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: invalid timestamp {text:?}")]
    Parse { line: usize, text: String },
}

/// Parse an edge log held in memory
pub fn parse_edge_log(content: &str) -> Result<Vec<Timestamp>, EdgeLogError> {
    let mut edges = Vec::new();
    let mut backwards = 0usize;

    for (index, raw) in content.lines().enumerate() {
        let text = raw.split('#').next().unwrap_or_default().trim();
        if text.is_empty() {
            continue;
        }

        let timestamp = parse_timestamp(text).ok_or_else(|| EdgeLogError::Parse {
            line: index + 1,
            text: text.to_string(),
        })?;

        if edges
            .last()
            .is_some_and(|&last| (timestamp.wrapping_sub(last) as i32) < 0)
        {
            backwards += 1;
        }
        edges.push(timestamp);
    }

    if backwards > 0 {
        warn!(
            "Edge log has {} non-monotonic timestamps; they will render late",
            backwards
        );
    }
    Ok(edges)
}

/// Read and parse an edge log file
pub fn read_edge_log(path: &Path) -> Result<Vec<Timestamp>, EdgeLogError> {
    let content = std::fs::read_to_string(path).map_err(|source| EdgeLogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_edge_log(&content)
}

fn parse_timestamp(text: &str) -> Option<Timestamp> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => Timestamp::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}
