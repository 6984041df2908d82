use serde::{Deserialize, Serialize};

/// Unix timestamp in seconds
pub type TimestampSec = i64;

/// Single OHLCV observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub time: TimestampSec,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default, deserialize_with = "deserialize_volume")]
    pub volume: f64,
}

/// Absent or empty volume is treated as zero
fn deserialize_volume<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

impl Bar {
    pub fn new(time: TimestampSec, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Price extent of the bar
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn is_up(&self) -> bool {
        self.close >= self.open
    }

    /// Read the configured price field
    pub fn price(&self, source: PriceSource) -> f64 {
        match source {
            PriceSource::Open => self.open,
            PriceSource::High => self.high,
            PriceSource::Low => self.low,
            PriceSource::Close => self.close,
            PriceSource::Hl2 => (self.high + self.low) / 2.0,
            PriceSource::Hlc3 => (self.high + self.low + self.close) / 3.0,
            PriceSource::Ohlc4 => (self.open + self.high + self.low + self.close) / 4.0,
        }
    }
}

/// Derived `{time, value}` observation. A non-finite value marks a missing observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub time: TimestampSec,
    pub value: f64,
}

impl Point {
    pub fn new(time: TimestampSec, value: f64) -> Self {
        Self { time, value }
    }

    pub fn is_missing(&self) -> bool {
        !self.value.is_finite()
    }
}

/// Bar field feeding an indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Open,
    High,
    Low,
    #[default]
    Close,
    Hl2,
    Hlc3,
    Ohlc4,
}

/// Project bars onto a point series using the given price field
pub fn bars_to_points(bars: &[Bar], source: PriceSource) -> Vec<Point> {
    bars.iter()
        .map(|bar| Point::new(bar.time, bar.price(source)))
        .collect()
}

/// Check that a series is strictly ascending by time
pub fn is_strictly_ascending<T>(items: &[T], time_of: impl Fn(&T) -> TimestampSec) -> bool {
    items.windows(2).all(|pair| time_of(&pair[0]) < time_of(&pair[1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_sources() {
        let bar = Bar::new(0, 10.0, 14.0, 8.0, 12.0, 5.0);
        assert_eq!(bar.price(PriceSource::Close), 12.0);
        assert_eq!(bar.price(PriceSource::Hl2), 11.0);
        assert!((bar.price(PriceSource::Hlc3) - 34.0 / 3.0).abs() < 1e-12);
        assert_eq!(bar.price(PriceSource::Ohlc4), 11.0);
        assert_eq!(bar.range(), 6.0);
        assert!(bar.is_up());
    }

    #[test]
    fn test_missing_point() {
        assert!(Point::new(0, f64::NAN).is_missing());
        assert!(!Point::new(0, 1.0).is_missing());
    }

    #[test]
    fn test_volume_defaults_to_zero() {
        let bar: Bar = serde_json::from_str(r#"{"time":60,"open":1,"high":2,"low":0.5,"close":1.5}"#).unwrap();
        assert_eq!(bar.volume, 0.0);
    }

    #[test]
    fn test_ascending_check() {
        let points = vec![Point::new(1, 0.0), Point::new(2, 0.0), Point::new(2, 0.0)];
        assert!(!is_strictly_ascending(&points, |p| p.time));
        assert!(is_strictly_ascending(&points[..2], |p| p.time));
    }
}
