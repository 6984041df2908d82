/// Alerts Module
///
/// Level-crossing detection over the series the engine derives (close prices, RSI, CVD).
/// Delivery of the resulting events is left to the caller.
pub mod crossings;

pub use crossings::{detect_crossings, series_for, CrossDirection, DataSource, LevelCrossing};
