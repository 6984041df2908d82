/// Fixed Range Volume Profile Module
///
/// Splits a selected bar range into price rows, distributes each bar's volume across the
/// rows it spans, and derives the point of control and value area. Optionally samples the
/// developing POC/VAH/VAL over growing prefixes of the range.
pub mod calculator;
pub mod structs;
pub mod validation;

pub use calculator::{
    build_rows, calculate_profile, calculate_profile_for_range, calculate_value_area, distribute_volume,
    find_poc, row_count,
};
pub use structs::{
    DevelopingPoint, FrvpConfig, IndicatorToggles, Profile, ProfileColors, ProfilePlacement, ProfileRow,
    RowsLayout, ValueArea, VolumeProfileDisplay, MAX_DEVELOPING_SAMPLES, MAX_ROWS,
};
pub use validation::{ProfileValidationError, ProfileValidationResult, ProfileValidator};
