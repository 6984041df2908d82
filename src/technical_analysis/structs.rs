use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

use crate::errors::IndicatorError;
use crate::market_data::{Point, PriceSource, TimestampSec};
use super::smoothing::MovingAverageKind;

/// Smoothing applied to the RSI line itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaType {
    #[serde(rename = "SMA")]
    Sma,
    #[serde(rename = "EMA")]
    Ema,
    /// Wilder smoothing (RMA)
    #[serde(rename = "SMMA", alias = "RMA")]
    Smma,
    #[serde(rename = "WMA")]
    Wma,
    /// Weighted by the volume of the bar sharing each RSI timestamp
    #[serde(rename = "VWMA")]
    Vwma,
    /// SMA line with Bollinger bands
    #[serde(rename = "BB", alias = "Bollinger Bands")]
    Bb,
}

impl std::fmt::Display for MaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Sma => "SMA",
            Self::Ema => "EMA",
            Self::Smma => "SMMA",
            Self::Wma => "WMA",
            Self::Vwma => "VWMA",
            Self::Bb => "BB",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for MaType {
    type Err = IndicatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SMA" => Ok(Self::Sma),
            "EMA" => Ok(Self::Ema),
            "SMMA" | "RMA" => Ok(Self::Smma),
            "WMA" => Ok(Self::Wma),
            "VWMA" => Ok(Self::Vwma),
            "BB" | "BOLLINGER BANDS" => Ok(Self::Bb),
            _ => Err(IndicatorError::InvalidConfiguration(format!(
                "Invalid moving average type: {}. Valid options: SMA, EMA, SMMA, WMA, VWMA, BB",
                s
            ))),
        }
    }
}

/// Smoothing line drawn over the RSI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiSmoothingConfig {
    pub ma_type: MaType,
    pub length: usize,
    /// Standard deviation multiplier for `MaType::Bb`
    pub bb_mult: f64,
}

impl Default for RsiSmoothingConfig {
    fn default() -> Self {
        Self {
            ma_type: MaType::Sma,
            length: 14,
            bb_mult: 2.0,
        }
    }
}

/// Pivot window and pivot spacing used for divergence detection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DivergenceConfig {
    pub pivot_left: usize,
    pub pivot_right: usize,
    /// Minimum bars between two compared pivots
    pub range_lower: usize,
    /// Maximum bars between two compared pivots
    pub range_upper: usize,
}

impl Default for DivergenceConfig {
    fn default() -> Self {
        Self {
            pivot_left: 5,
            pivot_right: 5,
            range_lower: 5,
            range_upper: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiConfig {
    pub period: usize,
    pub source: PriceSource,
    pub smoothing: Option<RsiSmoothingConfig>,
    pub calculate_divergence: bool,
    pub divergence: DivergenceConfig,
}

impl Default for RsiConfig {
    fn default() -> Self {
        Self {
            period: 14,
            source: PriceSource::Close,
            smoothing: None,
            calculate_divergence: false,
            divergence: DivergenceConfig::default(),
        }
    }
}

impl RsiConfig {
    /// Clamp out-of-range values, logging every adjustment
    pub fn sanitize(&mut self) {
        clamp_period("rsi.period", &mut self.period);
        if let Some(smoothing) = self.smoothing.as_mut() {
            clamp_period("rsi.smoothing.length", &mut smoothing.length);
            if !smoothing.bb_mult.is_finite() || smoothing.bb_mult < 0.0 {
                warn!("rsi.smoothing.bb_mult {} out of range, using 2.0", smoothing.bb_mult);
                smoothing.bb_mult = 2.0;
            }
        }
        clamp_period("rsi.divergence.pivot_left", &mut self.divergence.pivot_left);
        clamp_period("rsi.divergence.pivot_right", &mut self.divergence.pivot_right);
        if self.divergence.range_upper < self.divergence.range_lower {
            warn!(
                "rsi.divergence.range_upper {} below range_lower {}, raising it",
                self.divergence.range_upper, self.divergence.range_lower
            );
            self.divergence.range_upper = self.divergence.range_lower;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdConfig {
    pub fast_length: usize,
    pub slow_length: usize,
    pub signal_length: usize,
    pub source: PriceSource,
    pub oscillator_ma: MovingAverageKind,
    pub signal_ma: MovingAverageKind,
}

impl Default for MacdConfig {
    fn default() -> Self {
        Self {
            fast_length: 12,
            slow_length: 26,
            signal_length: 9,
            source: PriceSource::Close,
            oscillator_ma: MovingAverageKind::Ema,
            signal_ma: MovingAverageKind::Ema,
        }
    }
}

impl MacdConfig {
    pub fn sanitize(&mut self) {
        clamp_period("macd.fast_length", &mut self.fast_length);
        clamp_period("macd.slow_length", &mut self.slow_length);
        clamp_period("macd.signal_length", &mut self.signal_length);
    }
}

fn clamp_period(name: &str, period: &mut usize) {
    if *period == 0 {
        warn!("{} must be at least 1, got 0", name);
        *period = 1;
    }
}

/// Upper/middle/lower band series sharing the same timestamps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BollingerBands {
    pub upper: Vec<Point>,
    pub middle: Vec<Point>,
    pub lower: Vec<Point>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DivergenceKind {
    /// Price lower low with RSI higher low
    Bullish,
    /// Price higher high with RSI lower high
    Bearish,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Divergence {
    pub kind: DivergenceKind,
    pub start_time: TimestampSec,
    pub end_time: TimestampSec,
    pub start_rsi: f64,
    pub end_rsi: f64,
    pub start_price: f64,
    pub end_price: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RsiOutput {
    pub rsi: Vec<Point>,
    /// Smoothing line, empty when smoothing is disabled
    pub smoothed: Vec<Point>,
    pub bands: Option<BollingerBands>,
    pub divergences: Vec<Divergence>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MacdOutput {
    pub macd: Vec<Point>,
    pub signal: Vec<Point>,
    pub histogram: Vec<Point>,
}
