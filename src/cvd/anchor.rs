//! Anchor periods evaluated in the exchange's local calendar.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::{IndicatorError, Result};
use crate::market_data::TimestampSec;

const SECONDS_PER_HOUR: i64 = 3600;
const FOUR_HOURS: i64 = 4 * SECONDS_PER_HOUR;

/// Window after which cumulative delta restarts from zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AnchorPeriod {
    #[serde(rename = "1H")]
    OneHour,
    #[serde(rename = "4H")]
    FourHour,
    #[default]
    #[serde(rename = "1D")]
    OneDay,
    #[serde(rename = "1W")]
    OneWeek,
}

impl std::fmt::Display for AnchorPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OneHour => write!(f, "1H"),
            Self::FourHour => write!(f, "4H"),
            Self::OneDay => write!(f, "1D"),
            Self::OneWeek => write!(f, "1W"),
        }
    }
}

impl FromStr for AnchorPeriod {
    type Err = IndicatorError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "1H" => Ok(Self::OneHour),
            "4H" => Ok(Self::FourHour),
            "1D" | "D" => Ok(Self::OneDay),
            "1W" | "W" => Ok(Self::OneWeek),
            _ => Err(IndicatorError::InvalidConfiguration(format!(
                "Invalid anchor period: {}. Valid options: 1H, 4H, 1D, 1W",
                s
            ))),
        }
    }
}

/// Fixed-offset exchange calendar with a daily session open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeCalendar {
    /// Offset of local time from UTC, in minutes
    pub utc_offset_minutes: i32,
    /// Session open as minutes after local midnight
    pub session_start_minutes: u32,
}

impl Default for ExchangeCalendar {
    /// UTC+05:30 with a 09:15 open
    fn default() -> Self {
        Self {
            utc_offset_minutes: 330,
            session_start_minutes: 9 * 60 + 15,
        }
    }
}

impl ExchangeCalendar {
    fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            IndicatorError::InvalidConfiguration(format!(
                "UTC offset of {} minutes is out of range",
                self.utc_offset_minutes
            ))
        })
    }

    fn local_time(&self, time: TimestampSec) -> Result<DateTime<FixedOffset>> {
        let utc = DateTime::from_timestamp(time, 0).ok_or(IndicatorError::InvalidTimestamp(time))?;
        Ok(utc.with_timezone(&self.offset()?))
    }

    /// Unix time of the session open on a local calendar date
    fn session_open(&self, date: NaiveDate) -> TimestampSec {
        let local_open = date.and_time(NaiveTime::default())
            + Duration::minutes(self.session_start_minutes as i64);
        local_open.and_utc().timestamp() - self.utc_offset_minutes as i64 * 60
    }

    /// Most recent session open at or before `time`
    fn daily_open(&self, time: TimestampSec) -> Result<(TimestampSec, NaiveDate)> {
        let date = self.local_time(time)?.date_naive();
        let open = self.session_open(date);
        if open <= time {
            return Ok((open, date));
        }
        let previous = date.pred_opt().ok_or(IndicatorError::InvalidTimestamp(time))?;
        Ok((self.session_open(previous), previous))
    }
}

/// Start of the anchor period containing `time`
pub fn anchor_start(time: TimestampSec, period: AnchorPeriod, calendar: &ExchangeCalendar) -> Result<TimestampSec> {
    match period {
        AnchorPeriod::OneHour => {
            let local = calendar.local_time(time)?;
            Ok(time - (local.minute() as i64 * 60 + local.second() as i64))
        }
        AnchorPeriod::OneDay => Ok(calendar.daily_open(time)?.0),
        AnchorPeriod::FourHour => {
            let (open, _) = calendar.daily_open(time)?;
            Ok(open + (time - open) / FOUR_HOURS * FOUR_HOURS)
        }
        AnchorPeriod::OneWeek => {
            let (_, date) = calendar.daily_open(time)?;
            let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
            Ok(calendar.session_open(monday))
        }
    }
}
