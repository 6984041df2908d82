use tracing::debug;

use crate::market_data::{bars_to_points, Bar};
use super::smoothing::{join_on_time, moving_average};
use super::structs::{MacdConfig, MacdOutput};

/// MACD line, signal and histogram. Every series only holds times where all of its inputs exist.
pub fn calculate_macd(bars: &[Bar], config: &MacdConfig) -> MacdOutput {
    let prices = bars_to_points(bars, config.source);

    let fast = moving_average(&prices, config.fast_length, config.oscillator_ma);
    let slow = moving_average(&prices, config.slow_length, config.oscillator_ma);
    let macd = join_on_time(&fast, &slow, |f, s| f - s);

    let signal = moving_average(&macd, config.signal_length, config.signal_ma);
    let histogram = join_on_time(&macd, &signal, |m, s| m - s);

    debug!(
        "MACD({},{},{}) computed: {} macd, {} signal, {} histogram points",
        config.fast_length,
        config.slow_length,
        config.signal_length,
        macd.len(),
        signal.len(),
        histogram.len()
    );

    MacdOutput {
        macd,
        signal,
        histogram,
    }
}
