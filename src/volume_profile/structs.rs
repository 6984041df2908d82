use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

use crate::errors::IndicatorError;
use crate::market_data::TimestampSec;

/// Upper bound on profile rows regardless of layout
pub const MAX_ROWS: usize = 2500;

/// Maximum number of developing samples per profile
pub const MAX_DEVELOPING_SAMPLES: usize = 50;

/// How `row_size` is interpreted when splitting the price range into rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RowsLayout {
    /// `row_size` is the number of rows
    #[default]
    Number,
    /// `row_size` is the price height of a row
    Tick,
    /// `row_size` is the row height as a percentage of the price range
    Percentage,
}

impl std::fmt::Display for RowsLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number => write!(f, "Number"),
            Self::Tick => write!(f, "Tick"),
            Self::Percentage => write!(f, "Percentage"),
        }
    }
}

impl FromStr for RowsLayout {
    type Err = IndicatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "number" => Ok(Self::Number),
            "tick" | "ticks" => Ok(Self::Tick),
            "percentage" | "percent" => Ok(Self::Percentage),
            _ => Err(IndicatorError::InvalidConfiguration(format!(
                "Invalid rows layout: {}. Valid options: Number, Tick, Percentage",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProfilePlacement {
    Left,
    #[default]
    Right,
}

/// Histogram presentation options carried for the rendering layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeProfileDisplay {
    /// Histogram width as a percentage of the selected range
    pub width_percent: f64,
    pub placement: ProfilePlacement,
    /// Split bars into up/down volume instead of total
    pub show_up_down: bool,
}

impl Default for VolumeProfileDisplay {
    fn default() -> Self {
        Self {
            width_percent: 30.0,
            placement: ProfilePlacement::Right,
            show_up_down: true,
        }
    }
}

/// Which derived levels are produced
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorToggles {
    pub vah: bool,
    pub val: bool,
    pub poc: bool,
    pub developing_poc: bool,
    pub developing_va: bool,
}

impl Default for IndicatorToggles {
    fn default() -> Self {
        Self {
            vah: true,
            val: true,
            poc: true,
            developing_poc: false,
            developing_va: false,
        }
    }
}

impl IndicatorToggles {
    pub fn wants_developing(&self) -> bool {
        self.developing_poc || self.developing_va
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileColors {
    pub up: String,
    pub down: String,
    pub value_area_up: String,
    pub value_area_down: String,
    pub poc: String,
    pub vah: String,
    pub val: String,
    pub developing_poc: String,
    pub developing_va: String,
    /// Histogram opacity, percent
    pub opacity: f64,
}

impl Default for ProfileColors {
    fn default() -> Self {
        Self {
            up: "#26a69a".to_string(),
            down: "#ef5350".to_string(),
            value_area_up: "#26a69a".to_string(),
            value_area_down: "#ef5350".to_string(),
            poc: "#ffeb3b".to_string(),
            vah: "#2196f3".to_string(),
            val: "#2196f3".to_string(),
            developing_poc: "#ff9800".to_string(),
            developing_va: "#00bcd4".to_string(),
            opacity: 70.0,
        }
    }
}

/// `#rrggbb` or `#rrggbbaa`
fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .map(|hex| (hex.len() == 6 || hex.len() == 8) && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}

impl ProfileColors {
    fn sanitize(&mut self) {
        let defaults = ProfileColors::default();
        let fields = [
            ("up", &mut self.up, &defaults.up),
            ("down", &mut self.down, &defaults.down),
            ("value_area_up", &mut self.value_area_up, &defaults.value_area_up),
            ("value_area_down", &mut self.value_area_down, &defaults.value_area_down),
            ("poc", &mut self.poc, &defaults.poc),
            ("vah", &mut self.vah, &defaults.vah),
            ("val", &mut self.val, &defaults.val),
            ("developing_poc", &mut self.developing_poc, &defaults.developing_poc),
            ("developing_va", &mut self.developing_va, &defaults.developing_va),
        ];
        for (name, value, default) in fields {
            if !is_hex_color(value) {
                warn!("frvp.colors.{} '{}' is not a hex color, using {}", name, value, default);
                *value = default.clone();
            }
        }
        self.opacity = clamp_percent("frvp.colors.opacity", self.opacity, defaults.opacity);
    }
}

/// Fixed Range Volume Profile configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrvpConfig {
    pub rows_layout: RowsLayout,
    pub row_size: f64,
    /// Percentage of total volume the value area should hold
    pub value_area_volume: f64,
    pub volume_profile: VolumeProfileDisplay,
    pub indicators: IndicatorToggles,
    pub colors: ProfileColors,
}

impl Default for FrvpConfig {
    fn default() -> Self {
        Self {
            rows_layout: RowsLayout::Number,
            row_size: 24.0,
            value_area_volume: 70.0,
            volume_profile: VolumeProfileDisplay::default(),
            indicators: IndicatorToggles::default(),
            colors: ProfileColors::default(),
        }
    }
}

fn clamp_percent(name: &str, value: f64, fallback: f64) -> f64 {
    if !value.is_finite() {
        warn!("{} is not finite, using {}", name, fallback);
        return fallback;
    }
    let clamped = value.clamp(0.0, 100.0);
    if clamped != value {
        warn!("{} {} out of range, clamped to {}", name, value, clamped);
    }
    clamped
}

impl FrvpConfig {
    /// Clamp every numeric option into its valid range, logging each adjustment
    pub fn sanitize(&mut self) {
        let defaults = FrvpConfig::default();

        self.value_area_volume = clamp_percent("frvp.value_area_volume", self.value_area_volume, defaults.value_area_volume);
        self.volume_profile.width_percent = clamp_percent(
            "frvp.volume_profile.width_percent",
            self.volume_profile.width_percent,
            defaults.volume_profile.width_percent,
        );

        if !self.row_size.is_finite() || self.row_size <= 0.0 {
            warn!("frvp.row_size {} must be positive, using 1", self.row_size);
            self.row_size = 1.0;
        }
        if self.rows_layout == RowsLayout::Number {
            let rows = self.row_size.round().clamp(1.0, MAX_ROWS as f64);
            if rows != self.row_size {
                warn!("frvp.row_size {} adjusted to {} rows", self.row_size, rows);
                self.row_size = rows;
            }
        }

        self.colors.sanitize();
    }
}

/// One price bucket of a profile, ascending by price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub index: usize,
    pub price_low: f64,
    pub price_high: f64,
    /// Row midpoint
    pub price_level: f64,
    pub up_volume: f64,
    pub down_volume: f64,
    pub total_volume: f64,
    pub delta: f64,
}

impl ProfileRow {
    pub fn new(index: usize, price_low: f64, price_high: f64) -> Self {
        Self {
            index,
            price_low,
            price_high,
            price_level: (price_low + price_high) / 2.0,
            up_volume: 0.0,
            down_volume: 0.0,
            total_volume: 0.0,
            delta: 0.0,
        }
    }

    pub fn add_volume(&mut self, volume: f64, is_up: bool) {
        if is_up {
            self.up_volume += volume;
        } else {
            self.down_volume += volume;
        }
        self.total_volume = self.up_volume + self.down_volume;
        self.delta = self.up_volume - self.down_volume;
    }
}

/// Result of value-area expansion around the POC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueArea {
    pub poc_index: usize,
    /// Highest-price row index in the value area
    pub vah_index: usize,
    /// Lowest-price row index in the value area
    pub val_index: usize,
    /// Row indices in the value area, ascending
    pub rows: Vec<usize>,
    pub volume: f64,
    pub target_volume: f64,
}

/// Running POC/VAH/VAL price levels of a profile prefix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DevelopingPoint {
    pub time: TimestampSec,
    pub poc: f64,
    pub vah: f64,
    pub val: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub rows: Vec<ProfileRow>,
    pub poc: ProfileRow,
    pub vah: ProfileRow,
    pub val: ProfileRow,
    pub value_area_rows: Vec<usize>,
    pub value_area_volume: f64,
    pub target_volume: f64,
    pub total_volume: f64,
    /// Sum of input bar volume, before distribution
    pub input_volume: f64,
    pub profile_high: f64,
    pub profile_low: f64,
    pub start_time: TimestampSec,
    pub end_time: TimestampSec,
    pub developing: Option<Vec<DevelopingPoint>>,
}

impl Profile {
    /// Volume-weighted average of row midpoints; 0 for an empty profile
    pub fn vwap(&self) -> f64 {
        if self.total_volume <= 0.0 {
            return 0.0;
        }
        self.rows.iter().map(|r| r.price_level * r.total_volume).sum::<f64>() / self.total_volume
    }

    pub fn is_in_value_area(&self, index: usize) -> bool {
        self.value_area_rows.binary_search(&index).is_ok()
    }
}
