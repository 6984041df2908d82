use std::io::Read;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::errors::Result;
use super::structs::{is_strictly_ascending, Bar};

/// Load bars from a CSV file with a `time,open,high,low,close[,volume]` header
pub fn load_bars_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Bar>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let bars = parse_bars_csv(file)?;
    info!("📥 Loaded {} bars from {}", bars.len(), path.display());
    Ok(bars)
}

/// Parse bars from any CSV reader and normalize their ordering
pub fn parse_bars_csv<R: Read>(reader: R) -> Result<Vec<Bar>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut bars = Vec::new();
    for record in csv_reader.deserialize::<Bar>() {
        let bar = record?;
        if !(bar.open.is_finite() && bar.high.is_finite() && bar.low.is_finite() && bar.close.is_finite()) {
            warn!("Skipping bar at {} with non-finite prices", bar.time);
            continue;
        }
        bars.push(bar);
    }

    Ok(normalize_bars(bars))
}

/// Sort bars by time and drop duplicate timestamps (last one wins)
pub fn normalize_bars(mut bars: Vec<Bar>) -> Vec<Bar> {
    if is_strictly_ascending(&bars, |bar| bar.time) {
        return bars;
    }

    let original_len = bars.len();
    // Stable sort keeps input order among equal timestamps so the last duplicate is the newest
    bars.sort_by_key(|bar| bar.time);

    let mut normalized: Vec<Bar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match normalized.last_mut() {
            Some(last) if last.time == bar.time => *last = bar,
            _ => normalized.push(bar),
        }
    }

    warn!(
        "Input bars were out of order or duplicated: {} in, {} after normalization",
        original_len,
        normalized.len()
    );
    debug!("Normalized bar range: {:?} to {:?}", normalized.first().map(|b| b.time), normalized.last().map(|b| b.time));
    normalized
}
