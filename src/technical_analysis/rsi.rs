use rustc_hash::FxHashMap;
use tracing::debug;

use crate::market_data::{Bar, Point, TimestampSec};
use super::smoothing::{ema, join_on_time, rma, sma, stdev, vwma_with_volumes, wma};
use super::structs::{
    BollingerBands, Divergence, DivergenceConfig, DivergenceKind, MaType, RsiConfig, RsiOutput,
    RsiSmoothingConfig,
};

/// Compute Wilder's RSI plus the optional smoothing line, bands and divergences
pub fn calculate_rsi(bars: &[Bar], config: &RsiConfig) -> RsiOutput {
    let rsi = rsi_series(bars, config);

    let (smoothed, bands) = match &config.smoothing {
        Some(smoothing) => smooth_rsi(&rsi, bars, smoothing),
        None => (Vec::new(), None),
    };

    let divergences = if config.calculate_divergence {
        detect_divergences(&rsi, bars, &config.divergence)
    } else {
        Vec::new()
    };

    debug!(
        "RSI({}) computed: {} bars -> {} points, {} divergences",
        config.period,
        bars.len(),
        rsi.len(),
        divergences.len()
    );

    RsiOutput {
        rsi,
        smoothed,
        bands,
        divergences,
    }
}

/// RSI line only. The value built from the change between bars `j` and `j+1` is stamped with bar `j+1`.
pub fn rsi_series(bars: &[Bar], config: &RsiConfig) -> Vec<Point> {
    if bars.len() < 2 {
        return Vec::new();
    }

    let (gains, losses): (Vec<Point>, Vec<Point>) = bars
        .windows(2)
        .map(|pair| {
            let change = pair[1].price(config.source) - pair[0].price(config.source);
            let time = pair[1].time;
            if change.is_finite() {
                (Point::new(time, change.max(0.0)), Point::new(time, (-change).max(0.0)))
            } else {
                (Point::new(time, f64::NAN), Point::new(time, f64::NAN))
            }
        })
        .unzip();

    let avg_gain = rma(&gains, config.period);
    let avg_loss = rma(&losses, config.period);

    join_on_time(&avg_gain, &avg_loss, rsi_value)
}

/// 100 when only gains, 50 when flat, otherwise the relative-strength formula
pub fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    let value = if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            50.0
        } else {
            100.0
        }
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    };
    value.clamp(0.0, 100.0)
}

fn smooth_rsi(
    rsi: &[Point],
    bars: &[Bar],
    smoothing: &RsiSmoothingConfig,
) -> (Vec<Point>, Option<BollingerBands>) {
    let length = smoothing.length;
    match smoothing.ma_type {
        MaType::Sma => (sma(rsi, length), None),
        MaType::Ema => (ema(rsi, length), None),
        MaType::Smma => (rma(rsi, length), None),
        MaType::Wma => (wma(rsi, length), None),
        MaType::Vwma => {
            let volume_by_time: FxHashMap<TimestampSec, f64> =
                bars.iter().map(|bar| (bar.time, bar.volume)).collect();
            let volumes: Vec<f64> = rsi
                .iter()
                .map(|point| volume_by_time.get(&point.time).copied().unwrap_or(0.0))
                .collect();
            (vwma_with_volumes(rsi, &volumes, length), None)
        }
        MaType::Bb => {
            let basis = sma(rsi, length);
            let deviation = stdev(rsi, length);
            let mult = smoothing.bb_mult;
            let bands = BollingerBands {
                upper: join_on_time(&basis, &deviation, |m, sd| m + mult * sd),
                middle: join_on_time(&basis, &deviation, |m, _| m),
                lower: join_on_time(&basis, &deviation, |m, sd| m - mult * sd),
            };
            (basis, Some(bands))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotKind {
    Low,
    High,
}

/// Indices that are strictly lower (or higher) than every other point within `left`/`right` bars
pub fn find_pivots(series: &[Point], left: usize, right: usize, kind: PivotKind) -> Vec<usize> {
    if series.len() < left + right + 1 {
        return Vec::new();
    }

    (left..series.len() - right)
        .filter(|&i| {
            let candidate = series[i].value;
            (i - left..=i + right).filter(|&k| k != i).all(|k| match kind {
                PivotKind::Low => candidate < series[k].value,
                PivotKind::High => candidate > series[k].value,
            })
        })
        .collect()
}

/// Compare consecutive RSI pivots against the price extremes of the bars at the same times
pub fn detect_divergences(rsi: &[Point], bars: &[Bar], config: &DivergenceConfig) -> Vec<Divergence> {
    let bar_by_time: FxHashMap<TimestampSec, &Bar> = bars.iter().map(|bar| (bar.time, bar)).collect();
    let mut divergences = Vec::new();

    for kind in [PivotKind::Low, PivotKind::High] {
        let pivots = find_pivots(rsi, config.pivot_left, config.pivot_right, kind);

        for pair in pivots.windows(2) {
            let (prev, curr) = (pair[0], pair[1]);
            let distance = curr - prev;
            if distance < config.range_lower || distance > config.range_upper {
                continue;
            }

            let (prev_point, curr_point) = (rsi[prev], rsi[curr]);
            let (Some(prev_bar), Some(curr_bar)) =
                (bar_by_time.get(&prev_point.time), bar_by_time.get(&curr_point.time))
            else {
                continue;
            };

            let divergence = match kind {
                PivotKind::Low if curr_bar.low < prev_bar.low && curr_point.value > prev_point.value => {
                    Some((DivergenceKind::Bullish, prev_bar.low, curr_bar.low))
                }
                PivotKind::High if curr_bar.high > prev_bar.high && curr_point.value < prev_point.value => {
                    Some((DivergenceKind::Bearish, prev_bar.high, curr_bar.high))
                }
                _ => None,
            };

            if let Some((kind, start_price, end_price)) = divergence {
                divergences.push(Divergence {
                    kind,
                    start_time: prev_point.time,
                    end_time: curr_point.time,
                    start_rsi: prev_point.value,
                    end_rsi: curr_point.value,
                    start_price,
                    end_price,
                });
            }
        }
    }

    divergences.sort_by_key(|d| d.end_time);
    divergences
}
