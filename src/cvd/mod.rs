/// Cumulative Volume Delta Module
///
/// Classifies 1-minute bars into signed volume and folds them into cumulative-delta
/// candles on the target timeframe, restarting at every anchor-period boundary.
pub mod anchor;
pub mod calculator;
pub mod structs;

pub use anchor::{anchor_start, AnchorPeriod, ExchangeCalendar};
pub use calculator::{calculate_cvd, classify_deltas};
pub use structs::{cvd_close_points, CvdCandle, CvdConfig};
