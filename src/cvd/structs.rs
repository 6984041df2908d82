use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::market_data::{Bar, Point, TimestampSec};
use super::anchor::{AnchorPeriod, ExchangeCalendar};

/// Largest representable fixed offset, in minutes (UTC±14:00)
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;
const MINUTES_PER_DAY: u32 = 24 * 60;

/// Cumulative volume delta configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CvdConfig {
    pub anchor_period: AnchorPeriod,
    /// Target candle resolution in minutes
    pub timeframe_minutes: u32,
    pub utc_offset_minutes: i32,
    /// Session open, minutes after local midnight
    pub session_start_minutes: u32,
}

impl Default for CvdConfig {
    fn default() -> Self {
        let calendar = ExchangeCalendar::default();
        Self {
            anchor_period: AnchorPeriod::OneDay,
            timeframe_minutes: 5,
            utc_offset_minutes: calendar.utc_offset_minutes,
            session_start_minutes: calendar.session_start_minutes,
        }
    }
}

impl CvdConfig {
    pub fn calendar(&self) -> ExchangeCalendar {
        ExchangeCalendar {
            utc_offset_minutes: self.utc_offset_minutes,
            session_start_minutes: self.session_start_minutes,
        }
    }

    pub fn timeframe_seconds(&self) -> i64 {
        self.timeframe_minutes.max(1) as i64 * 60
    }

    /// Clamp out-of-range values, logging every adjustment
    pub fn sanitize(&mut self) {
        if self.timeframe_minutes == 0 {
            warn!("cvd.timeframe_minutes must be at least 1, got 0");
            self.timeframe_minutes = 1;
        }
        let clamped = self.utc_offset_minutes.clamp(-MAX_UTC_OFFSET_MINUTES, MAX_UTC_OFFSET_MINUTES);
        if clamped != self.utc_offset_minutes {
            warn!("cvd.utc_offset_minutes {} out of range, clamped to {}", self.utc_offset_minutes, clamped);
            self.utc_offset_minutes = clamped;
        }
        if self.session_start_minutes >= MINUTES_PER_DAY {
            warn!(
                "cvd.session_start_minutes {} exceeds one day, wrapping",
                self.session_start_minutes
            );
            self.session_start_minutes %= MINUTES_PER_DAY;
        }
    }
}

/// Candle whose OHLC values are cumulative delta, not prices
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CvdCandle {
    pub time: TimestampSec,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Start of the anchor period this candle accumulates in
    pub anchor_start: TimestampSec,
    /// Underlying target-timeframe price candle
    pub price: Bar,
}

/// CVD close line, suitable for level alerts
pub fn cvd_close_points(candles: &[CvdCandle]) -> Vec<Point> {
    candles.iter().map(|c| Point::new(c.time, c.close)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_clamps_calendar() {
        let mut config = CvdConfig {
            timeframe_minutes: 0,
            utc_offset_minutes: 2000,
            session_start_minutes: 1500,
            ..CvdConfig::default()
        };
        config.sanitize();

        assert_eq!(config.timeframe_minutes, 1);
        assert_eq!(config.utc_offset_minutes, 840);
        assert_eq!(config.session_start_minutes, 60);
        assert_eq!(config.timeframe_seconds(), 60);
    }

    #[test]
    fn test_default_calendar_is_ist_open() {
        let calendar = CvdConfig::default().calendar();
        assert_eq!(calendar, ExchangeCalendar::default());
        assert_eq!(calendar.session_start_minutes, 555);
    }
}
