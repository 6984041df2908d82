pub mod alerts;
pub mod config;
pub mod cvd;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod market_data;
pub mod technical_analysis;
pub mod volume_profile;

pub use config::EngineConfig;
pub use engine::{run_engine, EngineReport};
pub use errors::{IndicatorError, Result};
