pub mod macd;
pub mod rsi;
pub mod smoothing;
pub mod structs;

// Re-export commonly used types for convenience
pub use macd::calculate_macd;
pub use rsi::{calculate_rsi, detect_divergences, find_pivots, rsi_series, PivotKind};
pub use smoothing::{ema, rma, sma, stdev, vwma, vwma_with_volumes, wma, ExponentialSmoother, MovingAverageKind};
pub use structs::{
    BollingerBands, Divergence, DivergenceConfig, DivergenceKind, MaType, MacdConfig, MacdOutput,
    RsiConfig, RsiOutput, RsiSmoothingConfig,
};
