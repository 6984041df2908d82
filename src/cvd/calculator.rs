use tracing::debug;

use crate::errors::Result;
use crate::market_data::Bar;
use super::anchor::anchor_start;
use super::structs::{CvdCandle, CvdConfig};

/// Signed volume per bar. Doji bars compare against the previous close, then inherit the
/// sign of the most recent non-zero delta; with neither available the delta is 0.
pub fn classify_deltas(bars: &[Bar]) -> Vec<f64> {
    let mut deltas = Vec::with_capacity(bars.len());
    let mut previous_close: Option<f64> = None;
    let mut previous_delta: Option<f64> = None;

    for bar in bars {
        let delta = if bar.close > bar.open {
            bar.volume
        } else if bar.close < bar.open {
            -bar.volume
        } else {
            match previous_close {
                Some(prev) if bar.close > prev => bar.volume,
                Some(prev) if bar.close < prev => -bar.volume,
                _ => match previous_delta {
                    Some(prev) if prev > 0.0 => bar.volume,
                    Some(_) => -bar.volume,
                    None => 0.0,
                },
            }
        };

        if delta != 0.0 {
            previous_delta = Some(delta);
        }
        previous_close = Some(bar.close);
        deltas.push(delta);
    }

    deltas
}

/// Aggregate 1-minute deltas into cumulative-delta candles aligned with `target_bars`
pub fn calculate_cvd(target_bars: &[Bar], minute_bars: &[Bar], config: &CvdConfig) -> Result<Vec<CvdCandle>> {
    let deltas = classify_deltas(minute_bars);
    let calendar = config.calendar();
    let timeframe = config.timeframe_seconds();

    let mut candles = Vec::with_capacity(target_bars.len());
    let mut cumulative = 0.0;
    let mut previous_anchor = None;

    for bar in target_bars {
        let anchor = anchor_start(bar.time, config.anchor_period, &calendar)?;
        if previous_anchor != Some(anchor) {
            if previous_anchor.is_some() {
                debug!("CVD anchor reset at {} (period {})", bar.time, config.anchor_period);
            }
            cumulative = 0.0;
            previous_anchor = Some(anchor);
        }

        let window_start = minute_bars.partition_point(|m| m.time < bar.time);
        let window_end = minute_bars.partition_point(|m| m.time < bar.time + timeframe);

        let open = cumulative;
        let (mut high, mut low) = (open, open);
        for &delta in &deltas[window_start..window_end.max(window_start)] {
            cumulative += delta;
            high = high.max(cumulative);
            low = low.min(cumulative);
        }

        candles.push(CvdCandle {
            time: bar.time,
            open,
            high,
            low,
            close: cumulative,
            anchor_start: anchor,
            price: *bar,
        });
    }

    debug!(
        "CVD computed: {} target candles from {} minute bars (anchor {})",
        candles.len(),
        minute_bars.len(),
        config.anchor_period
    );

    Ok(candles)
}
