use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::cvd::{cvd_close_points, CvdCandle};
use crate::errors::IndicatorError;
use crate::market_data::{bars_to_points, Bar, Point, PriceSource, TimestampSec};

/// Series an alert can watch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Price,
    Rsi,
    Cvd,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Price => write!(f, "price"),
            Self::Rsi => write!(f, "rsi"),
            Self::Cvd => write!(f, "cvd"),
        }
    }
}

impl FromStr for DataSource {
    type Err = IndicatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "price" | "close" => Ok(Self::Price),
            "rsi" => Ok(Self::Rsi),
            "cvd" => Ok(Self::Cvd),
            _ => Err(IndicatorError::InvalidConfiguration(format!(
                "Unknown alert data source: {}. Valid options: price, rsi, cvd",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrossDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelCrossing {
    pub time: TimestampSec,
    pub direction: CrossDirection,
    /// Series value at the crossing point
    pub value: f64,
}

/// Pick the series a data source refers to
pub fn series_for(source: DataSource, bars: &[Bar], rsi: &[Point], cvd: &[CvdCandle]) -> Vec<Point> {
    match source {
        DataSource::Price => bars_to_points(bars, PriceSource::Close),
        DataSource::Rsi => rsi.to_vec(),
        DataSource::Cvd => cvd_close_points(cvd),
    }
}

/// Every point where the series moves from strictly one side of `level` to on or beyond it.
///
/// Missing values break the comparison chain: the next finite value has no predecessor.
pub fn detect_crossings(series: &[Point], level: f64) -> Vec<LevelCrossing> {
    let mut crossings = Vec::new();
    let mut previous: Option<f64> = None;

    for point in series {
        if point.is_missing() {
            previous = None;
            continue;
        }

        if let Some(prev) = previous {
            if prev < level && point.value >= level {
                crossings.push(LevelCrossing {
                    time: point.time,
                    direction: CrossDirection::Up,
                    value: point.value,
                });
            } else if prev > level && point.value <= level {
                crossings.push(LevelCrossing {
                    time: point.time,
                    direction: CrossDirection::Down,
                    value: point.value,
                });
            }
        }
        previous = Some(point.value);
    }

    crossings
}
