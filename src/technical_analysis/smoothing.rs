//! Moving-average primitives over ordered point series.
//!
//! Every function is a pure transform: output points are aligned to the input point that
//! closes each full window, and a period larger than the input yields an empty series.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

use crate::errors::{IndicatorError, Result};
use crate::market_data::{Bar, Point, PriceSource};

/// Incremental exponential smoother seeded with the simple average of the first `period` values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExponentialSmoother {
    /// Smoothing period
    pub period: u32,
    /// Weight of the newest observation
    pub alpha: f64,
    /// Current smoothed value
    pub current_value: Option<f64>,
    /// Count of values processed (for initial SMA seed)
    pub count: u32,
    /// Sum for initial SMA seed
    pub sum: f64,
    /// Whether the seed has been emitted
    pub is_initialized: bool,
}

impl ExponentialSmoother {
    /// EMA smoother with `alpha = 2 / (period + 1)`
    pub fn ema(period: u32) -> Self {
        Self::with_alpha(period, 2.0 / (period as f64 + 1.0))
    }

    /// Wilder (RMA/SMMA) smoother with `alpha = 1 / period`
    pub fn wilder(period: u32) -> Self {
        Self::with_alpha(period, 1.0 / period.max(1) as f64)
    }

    fn with_alpha(period: u32, alpha: f64) -> Self {
        Self {
            period: period.max(1),
            alpha,
            current_value: None,
            count: 0,
            sum: 0.0,
            is_initialized: false,
        }
    }

    /// Add a new value and return the smoothed value once the seed window is full
    pub fn update(&mut self, value: f64) -> Option<f64> {
        self.count += 1;

        if self.count <= self.period {
            self.sum += value;

            if self.count == self.period {
                let seed = self.sum / self.period as f64;
                self.current_value = Some(seed);
                self.is_initialized = true;
                Some(seed)
            } else {
                None
            }
        } else {
            let previous = self.current_value?;
            let next = self.alpha * value + (1.0 - self.alpha) * previous;
            self.current_value = Some(next);
            Some(next)
        }
    }

    /// Current smoothed value if available
    pub fn value(&self) -> Option<f64> {
        self.current_value
    }

    pub fn is_ready(&self) -> bool {
        self.is_initialized
    }
}

/// Moving-average kinds selectable by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovingAverageKind {
    Sma,
    #[default]
    Ema,
}

/// Fail with `InsufficientData` when a series cannot fill one window
pub fn ensure_window(available: usize, period: usize) -> Result<()> {
    if period == 0 || available < period {
        return Err(IndicatorError::InsufficientData {
            required: period.max(1),
            available,
        });
    }
    Ok(())
}

/// Insufficient input degrades to an empty series
fn has_full_window(name: &str, available: usize, period: usize) -> bool {
    match ensure_window(available, period) {
        Ok(()) => true,
        Err(e) => {
            debug!("{} skipped: {}", name, e);
            false
        }
    }
}

/// Simple moving average. Windows containing a missing value emit nothing.
pub fn sma(series: &[Point], period: usize) -> Vec<Point> {
    if !has_full_window("SMA", series.len(), period) {
        return Vec::new();
    }

    series
        .windows(period)
        .filter(|window| window.iter().all(|p| !p.is_missing()))
        .map(|window| {
            let sum: f64 = window.iter().map(|p| p.value).sum();
            Point::new(window[period - 1].time, sum / period as f64)
        })
        .collect()
}

fn exponential(series: &[Point], mut smoother: ExponentialSmoother) -> Vec<Point> {
    series
        .iter()
        .filter(|point| !point.is_missing())
        .filter_map(|point| smoother.update(point.value).map(|value| Point::new(point.time, value)))
        .collect()
}

/// Exponential moving average with an SMA seed
pub fn ema(series: &[Point], period: usize) -> Vec<Point> {
    if !has_full_window("EMA", series.len(), period) {
        return Vec::new();
    }
    exponential(series, ExponentialSmoother::ema(period as u32))
}

/// Wilder's moving average (RMA/SMMA) with an SMA seed
pub fn rma(series: &[Point], period: usize) -> Vec<Point> {
    if !has_full_window("RMA", series.len(), period) {
        return Vec::new();
    }
    exponential(series, ExponentialSmoother::wilder(period as u32))
}

/// Linearly weighted moving average, newest observation weighted `period`
pub fn wma(series: &[Point], period: usize) -> Vec<Point> {
    if !has_full_window("WMA", series.len(), period) {
        return Vec::new();
    }

    let normalizer = (period * (period + 1)) as f64 / 2.0;
    series
        .windows(period)
        .filter(|window| window.iter().all(|p| !p.is_missing()))
        .map(|window| {
            let weighted: f64 = window
                .iter()
                .enumerate()
                .map(|(i, p)| p.value * (i + 1) as f64)
                .sum();
            Point::new(window[period - 1].time, weighted / normalizer)
        })
        .collect()
}

/// Volume-weighted moving average of a bar price field; 0 when the window has no volume
pub fn vwma(bars: &[Bar], period: usize, source: PriceSource) -> Vec<Point> {
    let points: Vec<Point> = bars.iter().map(|b| Point::new(b.time, b.price(source))).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
    vwma_with_volumes(&points, &volumes, period)
}

/// Volume-weighted moving average over points with a parallel volume slice
pub fn vwma_with_volumes(series: &[Point], volumes: &[f64], period: usize) -> Vec<Point> {
    let len = series.len().min(volumes.len());
    if !has_full_window("VWMA", len, period) {
        return Vec::new();
    }

    let mut window: VecDeque<(f64, f64)> = VecDeque::with_capacity(period);
    let mut output = Vec::with_capacity(len + 1 - period);

    for (point, &volume) in series.iter().zip(volumes.iter()) {
        window.push_back((point.value, volume));
        if window.len() > period {
            window.pop_front();
        }
        if window.len() < period || window.iter().any(|(value, _)| !value.is_finite()) {
            continue;
        }

        // Recomputed per window so long series do not accumulate cancellation error
        let (weighted, total_volume) = window
            .iter()
            .fold((0.0, 0.0), |(w, v), (value, volume)| (w + value * volume, v + volume));
        let value = if total_volume == 0.0 { 0.0 } else { weighted / total_volume };
        output.push(Point::new(point.time, value));
    }

    output
}

/// Population standard deviation over the trailing window
pub fn stdev(series: &[Point], period: usize) -> Vec<Point> {
    if !has_full_window("STDEV", series.len(), period) {
        return Vec::new();
    }

    series
        .windows(period)
        .filter(|window| window.iter().all(|p| !p.is_missing()))
        .map(|window| {
            let mean = window.iter().map(|p| p.value).sum::<f64>() / period as f64;
            let variance = window.iter().map(|p| (p.value - mean).powi(2)).sum::<f64>() / period as f64;
            Point::new(window[period - 1].time, variance.sqrt())
        })
        .collect()
}

/// Apply the selected moving-average kind
pub fn moving_average(series: &[Point], period: usize, kind: MovingAverageKind) -> Vec<Point> {
    match kind {
        MovingAverageKind::Sma => sma(series, period),
        MovingAverageKind::Ema => ema(series, period),
    }
}

/// Inner join of two time-ascending series, combining values present at the same time
pub fn join_on_time(left: &[Point], right: &[Point], combine: impl Fn(f64, f64) -> f64) -> Vec<Point> {
    let mut output = Vec::with_capacity(left.len().min(right.len()));
    let (mut i, mut j) = (0, 0);

    while i < left.len() && j < right.len() {
        match left[i].time.cmp(&right[j].time) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                output.push(Point::new(left[i].time, combine(left[i].value, right[j].value)));
                i += 1;
                j += 1;
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> Vec<Point> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Point::new(i as i64 * 60, v))
            .collect()
    }

    #[test]
    fn test_exponential_smoother_seed_and_update() {
        let mut ema = ExponentialSmoother::ema(3);

        assert_eq!(ema.update(10.0), None);
        assert_eq!(ema.update(12.0), None);

        let first = ema.update(14.0).unwrap();
        assert!((first - 12.0).abs() < 1e-12); // (10+12+14)/3

        let second = ema.update(16.0).unwrap();
        assert!((second - 14.0).abs() < 1e-12); // 16*0.5 + 12*0.5
        assert!(ema.is_ready());
    }

    #[test]
    fn test_wilder_alpha() {
        let smoother = ExponentialSmoother::wilder(14);
        assert!((smoother.alpha - 1.0 / 14.0).abs() < 1e-15);
    }

    #[test]
    fn test_sma_alignment_and_values() {
        let out = sma(&series(&[1.0, 2.0, 3.0, 4.0, 5.0]), 3);

        assert_eq!(out.len(), 3);
        assert_eq!(out[0].time, 120);
        assert!((out[0].value - 2.0).abs() < 1e-12);
        assert!((out[2].value - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_sma_skips_windows_with_missing_values() {
        let out = sma(&series(&[1.0, f64::NAN, 3.0, 4.0, 5.0, 6.0]), 2);
        let times: Vec<i64> = out.iter().map(|p| p.time).collect();

        assert_eq!(times, vec![180, 240, 300]);
        assert!((out[0].value - 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_sma_is_exact_after_large_value_leaves_window() {
        let out = sma(&series(&[1e16, 1.0, 1.0, 1.0]), 2);
        let values: Vec<f64> = out.iter().map(|p| p.value).collect();

        assert_eq!(values, vec![(1e16 + 1.0) / 2.0, 1.0, 1.0]);
    }

    #[test]
    fn test_insufficient_data_yields_empty_series() {
        let data = series(&[1.0, 2.0]);
        assert!(sma(&data, 3).is_empty());
        assert!(ema(&data, 3).is_empty());
        assert!(rma(&data, 0).is_empty());
        assert!(matches!(
            ensure_window(2, 3),
            Err(IndicatorError::InsufficientData { required: 3, available: 2 })
        ));
    }

    #[test]
    fn test_rma_recurrence() {
        let out = rma(&series(&[2.0, 4.0, 6.0, 8.0]), 2);

        assert_eq!(out.len(), 3);
        assert!((out[0].value - 3.0).abs() < 1e-12);
        assert!((out[1].value - 4.5).abs() < 1e-12); // 0.5*6 + 0.5*3
        assert!((out[2].value - 6.25).abs() < 1e-12); // 0.5*8 + 0.5*4.5
    }

    #[test]
    fn test_wma_weights_newest_highest() {
        let out = wma(&series(&[1.0, 2.0, 3.0]), 3);

        assert_eq!(out.len(), 1);
        // (1*1 + 2*2 + 3*3) / 6
        assert!((out[0].value - 14.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_vwma_zero_volume_falls_back_to_zero() {
        let bars = vec![
            Bar::new(0, 1.0, 1.0, 1.0, 10.0, 0.0),
            Bar::new(60, 1.0, 1.0, 1.0, 20.0, 0.0),
            Bar::new(120, 1.0, 1.0, 1.0, 30.0, 3.0),
        ];
        let out = vwma(&bars, 2, PriceSource::Close);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].value, 0.0);
        assert!((out[1].value - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_population_stdev() {
        let out = stdev(&series(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 8);
        assert_eq!(out.len(), 1);
        assert!((out[0].value - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_join_on_time_is_inner_join() {
        let left = vec![Point::new(1, 1.0), Point::new(2, 2.0), Point::new(4, 4.0)];
        let right = vec![Point::new(2, 10.0), Point::new(3, 30.0), Point::new(4, 40.0)];
        let joined = join_on_time(&left, &right, |a, b| a - b);

        assert_eq!(joined, vec![Point::new(2, -8.0), Point::new(4, -36.0)]);
    }

    #[test]
    fn test_smoothing_is_idempotent() {
        let data = series(&[5.0, 3.0, 8.0, 1.0, 9.0, 2.0, 7.0]);
        assert_eq!(ema(&data, 3), ema(&data, 3));
        assert_eq!(wma(&data, 4), wma(&data, 4));
    }
}
