#![allow(dead_code)]

use indicator_engine::market_data::Bar;

/// 2024-03-12 09:15 IST, the default session open
pub const SESSION_OPEN: i64 = 1_710_215_100;

/// Create a sample bar around `price` with a fixed two-point range
pub fn create_sample_bar(timestamp: i64, price: f64, volume: f64) -> Bar {
    Bar::new(timestamp, price, price + 1.0, price - 1.0, price + 0.5, volume)
}

/// Bars whose close rises by `step` every bar
pub fn create_trending_bars(count: usize, start_price: f64, step: f64, interval_secs: i64) -> Vec<Bar> {
    (0..count)
        .map(|i| {
            let close = start_price + step * i as f64;
            let open = close - step;
            Bar::new(
                SESSION_OPEN + i as i64 * interval_secs,
                open,
                open.max(close) + 0.25,
                open.min(close) - 0.25,
                close,
                1000.0 + i as f64,
            )
        })
        .collect()
}

/// Deterministic oscillating series, useful for divergence and profile shape tests
pub fn create_oscillating_bars(count: usize, interval_secs: i64) -> Vec<Bar> {
    (0..count)
        .map(|i| {
            let t = i as f64;
            let close = 100.0 + (t * 0.15).sin() * 8.0 + (t * 0.031).cos() * 3.0;
            let open = 100.0 + ((t - 1.0) * 0.15).sin() * 8.0 + ((t - 1.0) * 0.031).cos() * 3.0;
            Bar::new(
                SESSION_OPEN + i as i64 * interval_secs,
                open,
                open.max(close) + 0.4,
                open.min(close) - 0.4,
                close,
                500.0 + ((i * 37) % 250) as f64,
            )
        })
        .collect()
}

/// Aggregate 1-minute bars into `minutes`-wide target bars aligned to the first bar
pub fn aggregate_bars(minute_bars: &[Bar], minutes: usize) -> Vec<Bar> {
    minute_bars
        .chunks(minutes)
        .map(|chunk| {
            let first = chunk[0];
            let last = chunk[chunk.len() - 1];
            Bar::new(
                first.time,
                first.open,
                chunk.iter().map(|b| b.high).fold(f64::MIN, f64::max),
                chunk.iter().map(|b| b.low).fold(f64::MAX, f64::min),
                last.close,
                chunk.iter().map(|b| b.volume).sum(),
            )
        })
        .collect()
}

/// Render bars as the CSV layout the loader accepts
pub fn bars_to_csv(bars: &[Bar]) -> String {
    let mut csv = String::from("time,open,high,low,close,volume\n");
    for bar in bars {
        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            bar.time, bar.open, bar.high, bar.low, bar.close, bar.volume
        ));
    }
    csv
}
